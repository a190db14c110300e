use super::*;

pub async fn role_grants_handler(
    State(state): State<AppState>,
    Path(role_id): Path<i64>,
) -> ApiResult<Json<Vec<SubjectGrantsResponse>>> {
    let grants = state
        .permission_resolver
        .resolve_for_role(RoleId::new(role_id))
        .await?
        .into_iter()
        .map(SubjectGrantsResponse::from)
        .collect();

    Ok(Json(grants))
}

pub async fn user_grants_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Vec<SubjectGrantsResponse>>> {
    let grants = state
        .permission_resolver
        .resolve_for_user(UserId::new(user_id))
        .await?
        .into_iter()
        .map(SubjectGrantsResponse::from)
        .collect();

    Ok(Json(grants))
}

pub async fn role_permissions_by_slug_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<RolePermissionSummaryResponse>> {
    let summary = state
        .permission_resolver
        .resolve_for_role_by_slug(&slug)
        .await?;

    Ok(Json(RolePermissionSummaryResponse::from(summary)))
}

/// Named-actions replacement: unknown subject or action names abort
/// the whole call.
pub async fn replace_named_permissions_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<ReplacePermissionsRequest>,
) -> ApiResult<StatusCode> {
    state
        .permission_writer
        .replace_role_permissions(&slug, payload.permissions, GrantPolicy::Strict)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Boolean-flags replacement: unknown names are added to the catalog
/// on the fly.
pub async fn replace_flag_permissions_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<ReplacePermissionsRequest>,
) -> ApiResult<StatusCode> {
    state
        .permission_writer
        .replace_role_permissions(&slug, payload.permissions, GrantPolicy::Lenient)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn permission_catalog_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<SubjectGrantsResponse>>> {
    let catalog = state
        .permission_resolver
        .permission_catalog()
        .await?
        .into_iter()
        .map(SubjectGrantsResponse::from)
        .collect();

    Ok(Json(catalog))
}

pub async fn subjects_handler(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<SubjectResponse>>> {
    let subjects = state
        .permission_resolver
        .list_subjects()
        .await?
        .into_iter()
        .map(SubjectResponse::from)
        .collect();

    Ok(Json(subjects))
}
