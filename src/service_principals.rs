//! App role assignments granted on service principals.

use reqwest::Method;
use tracing::debug;

use crate::client::GraphClient;
use crate::context::CallContext;
use crate::error::Result;
use crate::models::{ServicePrincipal, required};

/// Lists the assignments granted on a service principal's app roles
/// (`servicePrincipals/{id}/appRoleAssignedTo`): every user, group and
/// service principal that holds one of its roles.
///
/// # Errors
///
/// - `GraphError::MissingField` — `service_principal_id` is empty.
/// - `GraphError::Api` — non-success status, e.g. 404 for an unknown id.
/// - `GraphError::Parse` — the body was not an OData collection.
pub async fn get_app_role_assigned_to_for_service_principal(
    client: &GraphClient,
    ctx: &CallContext,
    service_principal_id: &str,
) -> Result<ServicePrincipal> {
    let sp_id = required(Some(service_principal_id), "service_principal_id")?;

    debug!(service_principal_id = sp_id, "listing app role assignments granted on service principal");
    let url = client.endpoint(&["servicePrincipals", sp_id, "appRoleAssignedTo"])?;
    let request = client.new_request::<()>(Method::GET, url.as_str(), None)?;
    client.execute_json(ctx, request).await
}
