use super::*;

pub async fn list_users_handler(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<UserWithRoleResponse>>> {
    let users = state
        .user_service
        .list_users(UserListQuery {
            search: query.search.clone(),
            limit: query.limit(),
            offset: query.offset(),
        })
        .await?
        .into_iter()
        .map(UserWithRoleResponse::from)
        .collect();

    Ok(Json(users))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.user_service.get_user(UserId::new(user_id)).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .user_service
        .update_user(
            UserId::new(user_id),
            UserUpdate {
                first_name: payload.first_name,
                last_name: payload.last_name,
                email: payload.email,
                position: payload.position.map(RoleId::new),
            },
        )
        .await?;

    Ok(Json(UserResponse::from(user)))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.user_service.delete_user(UserId::new(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
