use super::*;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_service
        .list_roles(RoleListQuery {
            search: query.search.clone(),
            limit: query.limit(),
            offset: query.offset(),
        })
        .await?
        .into_iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state.role_service.create_role(&payload.name).await?;
    Ok((StatusCode::CREATED, Json(RoleResponse::from(role))))
}

pub async fn get_role_handler(
    State(state): State<AppState>,
    Path(role_id): Path<i64>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state.role_service.get_role(RoleId::new(role_id)).await?;
    Ok(Json(RoleResponse::from(role)))
}

pub async fn update_role_handler(
    State(state): State<AppState>,
    Path(role_id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> ApiResult<Json<RoleResponse>> {
    let role = state
        .role_service
        .update_role(RoleId::new(role_id), &payload.name)
        .await?;
    Ok(Json(RoleResponse::from(role)))
}

/// The identifier is taken raw so a malformed value maps to a
/// validation error instead of a routing miss.
pub async fn delete_role_handler(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.role_service.delete_role(&raw_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
