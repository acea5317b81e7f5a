//! App role assignments held by groups.
//!
//! This module covers the `groups/{id}/appRoleAssignments` endpoint family:
//!
//! - [`get_app_role_assignment_on_group`] — one assignment by its object id.
//! - [`get_app_role_assignments_for_group`] — every assignment of a group.
//! - [`add_app_role_assignment_to_group`] — grant a group an app role.
//! - [`remove_app_role_assignment_from_group`] — revoke an assignment.
//!
//! Required identifiers are validated before any request is built, so an
//! incomplete input fails with [`GraphError::MissingField`](crate::error::GraphError::MissingField)
//! rather than reaching the network.
//!
//! ## Permissions
//!
//! Reads need `Directory.Read.All`; add and remove need
//! `Directory.ReadWrite.All` (application) on Azure AD Graph.

use reqwest::Method;
use tracing::debug;

use crate::client::GraphClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::models::{
    AppRoleAssignment, AssignAppRoleRequest, DEFAULT_APP_ROLE_ID, Group, NewAppRoleAssignment,
    required,
};

const GROUPS: &str = "groups";
const APP_ROLE_ASSIGNMENTS: &str = "appRoleAssignments";

/// Retrieves a single app role assignment of a group.
///
/// # Errors
///
/// - `GraphError::MissingField` — `group_id` or `assignment_id` is empty.
/// - `GraphError::Api` — non-success status. A 404 means the group or the
///   assignment does not exist.
/// - `GraphError::Auth` — token acquisition failed.
/// - `GraphError::Cancelled` / `GraphError::DeadlineExceeded` — `ctx`
///   concluded first.
pub async fn get_app_role_assignment_on_group(
    client: &GraphClient,
    ctx: &CallContext,
    group_id: &str,
    assignment_id: &str,
) -> Result<AppRoleAssignment> {
    let group_id = required(Some(group_id), "group_id")?;
    let assignment_id = required(Some(assignment_id), "assignment_id")?;

    debug!(group_id, assignment_id, "getting app role assignment");
    let url = client.endpoint(&[GROUPS, group_id, APP_ROLE_ASSIGNMENTS, assignment_id])?;
    let request = client.new_request::<()>(Method::GET, url.as_str(), None)?;
    client.execute_json(ctx, request).await
}

/// Lists every app role assignment held by a group.
///
/// The collection is returned as Graph sends it, `odata.metadata` included.
/// Paging links, if any, are left in the response and not followed.
pub async fn get_app_role_assignments_for_group(
    client: &GraphClient,
    ctx: &CallContext,
    group_id: &str,
) -> Result<Group> {
    let group_id = required(Some(group_id), "group_id")?;

    debug!(group_id, "listing app role assignments for group");
    let url = client.endpoint(&[GROUPS, group_id, APP_ROLE_ASSIGNMENTS])?;
    let request = client.new_request::<()>(Method::GET, url.as_str(), None)?;
    client.execute_json(ctx, request).await
}

/// Assigns an app role to a group and returns the created assignment.
///
/// The group is always the principal of the new assignment. A request
/// without an `app_role_id` assigns the application's default role
/// ([`DEFAULT_APP_ROLE_ID`]).
///
/// # Errors
///
/// - `GraphError::MissingField` — `group_id` or `resource_id` is absent.
/// - `GraphError::Api` — e.g. 400 for an unknown role id, 409 when the
///   assignment already exists.
pub async fn add_app_role_assignment_to_group(
    client: &GraphClient,
    ctx: &CallContext,
    request: &AssignAppRoleRequest,
) -> Result<AppRoleAssignment> {
    let group_id = required(request.group_id.as_deref(), "group_id")?;
    let resource_id = required(request.resource_id.as_deref(), "resource_id")?;
    let app_role_id = match request.app_role_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => DEFAULT_APP_ROLE_ID,
    };

    let body = NewAppRoleAssignment {
        id: app_role_id,
        resource_id,
        principal_id: group_id,
    };

    debug!(group_id, resource_id, app_role_id, "adding app role assignment");
    let url = client.endpoint(&[GROUPS, group_id, APP_ROLE_ASSIGNMENTS, ""])?;
    let http_request = client.new_request(Method::POST, url.as_str(), Some(&body))?;
    client.execute_json(ctx, http_request).await
}

/// Removes an app role assignment from the group that holds it.
///
/// The target is derived from the assignment itself:
/// `groups/{principal_id}/appRoleAssignments/{object_id}`. Graph answers a
/// successful delete with an empty body, which is returned unchanged.
///
/// # Errors
///
/// - `GraphError::MissingField` — the assignment has no `principal_id` or
///   `object_id`.
/// - `GraphError::Api` — e.g. 404 when the assignment is already gone.
pub async fn remove_app_role_assignment_from_group(
    client: &GraphClient,
    ctx: &CallContext,
    assignment: &AppRoleAssignment,
) -> Result<String> {
    let principal_id = required(assignment.principal_id.as_deref(), "principal_id")?;
    let object_id = required(assignment.object_id.as_deref(), "object_id")?;

    debug!(principal_id, object_id, "removing app role assignment");
    let url = client.endpoint(&[GROUPS, principal_id, APP_ROLE_ASSIGNMENTS, object_id])?;
    let request = client.new_request::<()>(Method::DELETE, url.as_str(), None)?;
    client.execute_text(ctx, request).await
}
