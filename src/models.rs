//! Entity types for the app role assignment endpoints.
//!
//! Field names follow the Graph API contract (camelCase plus the dotted
//! `odata.*` annotations). Every scalar is optional because the API does not
//! guarantee presence. Keys the model does not know about are collected into
//! `additional_properties` instead of being dropped, so entities survive a
//! decode/encode round trip when Graph adds fields.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{GraphError, Result};

/// A JSON object with no fixed schema.
pub type Document = Map<String, Value>;

/// Decodes a loosely-typed document into a typed entity. Unknown keys end up
/// in the entity's own catch-all map, if it has one.
///
/// A known field holding an explicit `null` decodes to `None`, so
/// [`demote`] will not restore the `null`; nulls under unknown keys are
/// kept.
pub fn promote<T: DeserializeOwned>(doc: Document) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Encodes a typed entity back into a loosely-typed document.
///
/// Known fields that are `None` are omitted rather than written as `null`.
pub fn demote<T: Serialize>(entity: &T) -> Result<Document> {
    match serde_json::to_value(entity)? {
        Value::Object(doc) => Ok(doc),
        other => Err(GraphError::Parse(serde::ser::Error::custom(format!(
            "expected a JSON object, got {other}"
        )))),
    }
}

/// Directory object type of an entity.
///
/// Graph may report types this crate does not enumerate; those are kept
/// verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectType {
    /// Generic directory object.
    DirectoryObject,
    /// Security or distribution group.
    Group,
    /// Application instance in the tenant.
    ServicePrincipal,
    /// App role assignment.
    AppRoleAssignment,
    /// Any type not listed above, as Graph spelled it.
    Other(String),
}

impl ObjectType {
    /// The object types this crate knows by name.
    pub fn possible_values() -> [ObjectType; 4] {
        [
            ObjectType::DirectoryObject,
            ObjectType::Group,
            ObjectType::ServicePrincipal,
            ObjectType::AppRoleAssignment,
        ]
    }

    /// Wire name of the type.
    pub fn as_str(&self) -> &str {
        match self {
            ObjectType::DirectoryObject => "DirectoryObject",
            ObjectType::Group => "Group",
            ObjectType::ServicePrincipal => "ServicePrincipal",
            ObjectType::AppRoleAssignment => "AppRoleAssignment",
            ObjectType::Other(s) => s,
        }
    }
}

impl From<String> for ObjectType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "DirectoryObject" => ObjectType::DirectoryObject,
            "Group" => ObjectType::Group,
            "ServicePrincipal" => ObjectType::ServicePrincipal,
            "AppRoleAssignment" => ObjectType::AppRoleAssignment,
            _ => ObjectType::Other(s),
        }
    }
}

impl From<ObjectType> for String {
    fn from(t: ObjectType) -> Self {
        match t {
            ObjectType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records that a user, group or service principal is assigned an app role
/// on a resource.
///
/// Reference: <https://learn.microsoft.com/en-us/previous-versions/azure/ad/graph/api/entity-and-complex-type-reference#approleassignment-entity>
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<ObjectType>,

    /// `Microsoft.DirectoryServices.AppRoleAssignment`.
    #[serde(rename = "odata.type", default, skip_serializing_if = "Option::is_none")]
    pub odata_type: Option<String>,

    /// Identifier of the assignment itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    /// The role id that was assigned to the principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name of the principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_display_name: Option<String>,

    /// Principal granted the access. Required on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_id: Option<String>,

    /// `"User"`, `"Group"` or `"ServicePrincipal"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_type: Option<String>,

    /// Display name of the resource application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_display_name: Option<String>,

    /// Service principal of the resource the assignment was made on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,

    /// Every key not modelled above, verbatim.
    #[serde(flatten)]
    pub additional_properties: Document,
}

impl TryFrom<Document> for AppRoleAssignment {
    type Error = GraphError;

    fn try_from(doc: Document) -> Result<Self> {
        promote(doc)
    }
}

impl AppRoleAssignment {
    /// The assignment as a plain JSON object, extra keys included.
    pub fn to_document(&self) -> Result<Document> {
        demote(self)
    }
}

/// OData collection wrapper returned by list endpoints:
/// `{ "odata.metadata": "...", "value": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ODataCollection<T> {
    /// URL of the EDM metadata describing the collection.
    #[serde(rename = "odata.metadata", default, skip_serializing_if = "Option::is_none")]
    pub odata_metadata: Option<String>,

    /// Items of the collection. Absent means empty.
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// App role assignments held by a group.
pub type Group = ODataCollection<AppRoleAssignment>;

/// App role assignments granted on a service principal.
pub type ServicePrincipal = ODataCollection<AppRoleAssignment>;

/// The all-zero GUID Graph uses for an application's default role.
pub const DEFAULT_APP_ROLE_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Input for [`add_app_role_assignment_to_group`](crate::groups::add_app_role_assignment_to_group).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignAppRoleRequest {
    /// Group receiving the role. Required.
    pub group_id: Option<String>,
    /// Role to assign. Defaults to [`DEFAULT_APP_ROLE_ID`] when absent.
    pub app_role_id: Option<String>,
    /// Service principal id of the application exposing the role. Required.
    pub resource_id: Option<String>,
}

impl AssignAppRoleRequest {
    /// Request with both required identifiers set.
    pub fn new(
        group_id: impl Into<String>,
        app_role_id: Option<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        AssignAppRoleRequest {
            group_id: Some(group_id.into()),
            app_role_id,
            resource_id: Some(resource_id.into()),
        }
    }
}

/// POST body for creating an assignment. Field order is the wire order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewAppRoleAssignment<'a> {
    pub(crate) id: &'a str,
    pub(crate) resource_id: &'a str,
    pub(crate) principal_id: &'a str,
}

/// Returns `value` if it is present and non-empty.
pub(crate) fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(GraphError::MissingField(field)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FULL: &str = r#"{
        "odata.type": "Microsoft.DirectoryServices.AppRoleAssignment",
        "objectType": "AppRoleAssignment",
        "objectId": "kvQ6rqlaP0mnH0axH1yBVnB3NTzYc7hCuRgc8kS4ov8",
        "deletionTimestamp": null,
        "creationTimestamp": "2019-03-01T10:00:00Z",
        "id": "00000000-0000-0000-0000-000000000000",
        "principalDisplayName": "Payroll Admins",
        "principalId": "ae3af491-5aa9-493f-a71f-46b11f5c8156",
        "principalType": "Group",
        "resourceDisplayName": "Payroll",
        "resourceId": "7c2b7a1f-1dd4-4cb3-a2a8-07bbd2b8c7c5"
    }"#;

    #[test]
    fn assignment_deserializes_known_fields() {
        let a: AppRoleAssignment = serde_json::from_str(FULL).unwrap();
        assert_eq!(a.object_type, Some(ObjectType::AppRoleAssignment));
        assert_eq!(
            a.odata_type.as_deref(),
            Some("Microsoft.DirectoryServices.AppRoleAssignment")
        );
        assert_eq!(a.object_id.as_deref(), Some("kvQ6rqlaP0mnH0axH1yBVnB3NTzYc7hCuRgc8kS4ov8"));
        assert_eq!(a.id.as_deref(), Some(DEFAULT_APP_ROLE_ID));
        assert_eq!(a.principal_display_name.as_deref(), Some("Payroll Admins"));
        assert_eq!(a.principal_type.as_deref(), Some("Group"));
        assert_eq!(a.resource_display_name.as_deref(), Some("Payroll"));
        assert_eq!(a.resource_id.as_deref(), Some("7c2b7a1f-1dd4-4cb3-a2a8-07bbd2b8c7c5"));
    }

    #[test]
    fn unknown_keys_land_in_additional_properties() {
        let a: AppRoleAssignment = serde_json::from_str(FULL).unwrap();
        assert_eq!(a.additional_properties.len(), 2);
        assert_eq!(a.additional_properties["deletionTimestamp"], Value::Null);
        assert_eq!(
            a.additional_properties["creationTimestamp"],
            json!("2019-03-01T10:00:00Z")
        );
        assert!(!a.additional_properties.contains_key("principalId"));
    }

    #[test]
    fn round_trip_preserves_known_and_unknown_fields() {
        let first: AppRoleAssignment = serde_json::from_str(FULL).unwrap();
        let encoded = serde_json::to_string(&first).unwrap();
        let second: AppRoleAssignment = serde_json::from_str(&encoded).unwrap();
        assert_eq!(first, second);

        let original: Value = serde_json::from_str(FULL).unwrap();
        let reencoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, reencoded);
    }

    #[test]
    fn nested_unknown_values_survive_round_trip() {
        let json = json!({
            "objectId": "o-1",
            "appRoleScopes": [{"scope": "read", "weight": 1.5}],
            "flags": {"nested": {"deep": true}}
        });
        let a: AppRoleAssignment = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(serde_json::to_value(&a).unwrap(), json);
    }

    #[test]
    fn empty_object_decodes_to_all_none() {
        let a: AppRoleAssignment = serde_json::from_str("{}").unwrap();
        assert_eq!(a, AppRoleAssignment::default());
        assert_eq!(serde_json::to_string(&a).unwrap(), "{}");
    }

    #[test]
    fn null_known_fields_decode_to_none() {
        let a: AppRoleAssignment =
            serde_json::from_str(r#"{"principalDisplayName": null, "objectType": null}"#).unwrap();
        assert!(a.principal_display_name.is_none());
        assert!(a.object_type.is_none());
        assert!(a.additional_properties.is_empty());
    }

    #[test]
    fn unrecognised_object_type_is_kept() {
        let a: AppRoleAssignment = serde_json::from_str(r#"{"objectType": "User"}"#).unwrap();
        assert_eq!(a.object_type, Some(ObjectType::Other("User".to_string())));
        assert_eq!(serde_json::to_value(&a).unwrap(), json!({"objectType": "User"}));
    }

    #[test]
    fn possible_values_lists_known_types() {
        let names: Vec<String> = ObjectType::possible_values()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            names,
            ["DirectoryObject", "Group", "ServicePrincipal", "AppRoleAssignment"]
        );
    }

    #[test]
    fn promote_and_demote_are_inverse() {
        let doc: Document = serde_json::from_str(FULL).unwrap();
        let a = AppRoleAssignment::try_from(doc.clone()).unwrap();
        assert_eq!(a.principal_id.as_deref(), Some("ae3af491-5aa9-493f-a71f-46b11f5c8156"));
        let back = a.to_document().unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn demote_omits_null_known_fields_but_keeps_unknown_nulls() {
        let doc: Document =
            serde_json::from_str(r#"{"principalDisplayName": null, "x": 1, "y": null}"#).unwrap();
        let a: AppRoleAssignment = promote(doc).unwrap();
        assert!(a.principal_display_name.is_none());
        assert_eq!(demote(&a).unwrap(), json!({"x": 1, "y": null}).as_object().unwrap().clone());
    }

    #[test]
    fn demote_rejects_non_object() {
        assert!(matches!(demote(&vec![1, 2]), Err(GraphError::Parse(_))));
    }

    #[test]
    fn collection_deserializes_group_listing() {
        let json = r#"{
            "odata.metadata": "https://graph.windows.net/contoso/$metadata#directoryObjects/Microsoft.DirectoryServices.AppRoleAssignment",
            "value": [
                {"objectId": "a-1", "principalId": "g-1"},
                {"objectId": "a-2", "principalId": "g-1", "extra": 3}
            ]
        }"#;
        let group: Group = serde_json::from_str(json).unwrap();
        assert!(group.odata_metadata.unwrap().ends_with("AppRoleAssignment"));
        assert_eq!(group.value.len(), 2);
        assert_eq!(group.value[1].object_id.as_deref(), Some("a-2"));
        assert_eq!(group.value[1].additional_properties["extra"], json!(3));
    }

    #[test]
    fn collection_without_value_is_empty() {
        let sp: ServicePrincipal = serde_json::from_str(r#"{"odata.metadata": "m"}"#).unwrap();
        assert!(sp.value.is_empty());
    }

    #[test]
    fn new_assignment_body_has_exact_shape() {
        let body = NewAppRoleAssignment {
            id: "R",
            resource_id: "S",
            principal_id: "G",
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"id":"R","resourceId":"S","principalId":"G"}"#
        );
    }

    #[test]
    fn required_rejects_absent_and_empty() {
        assert_eq!(required(Some("x"), "f").unwrap(), "x");
        assert!(matches!(required(None, "f"), Err(GraphError::MissingField("f"))));
        assert!(matches!(required(Some(""), "f"), Err(GraphError::MissingField("f"))));
    }
}
