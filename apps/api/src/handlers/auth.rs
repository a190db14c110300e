use axum::http::HeaderMap;
use rolegate_core::AppError;

use crate::middleware::bearer_token;

use super::*;

pub async fn register_handler(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let position = payload
        .position
        .map(RoleId::new)
        .unwrap_or(state.default_role_id);

    let user = state
        .user_service
        .register(RegisterParams {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            password: payload.password,
            position,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .user_service
        .authenticate(&payload.username, &payload.password)
        .await?;

    let role = state.role_service.get_role(user.position).await?;

    let permissions = state
        .permission_resolver
        .resolve_for_user(user.id)
        .await?
        .into_iter()
        .map(SubjectGrantsResponse::from)
        .collect();

    let identity = UserIdentity::new(user.id, user.username.clone(), user.position);
    let token = state.access_token_service.issue(&identity).await?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
        role: role.name,
        permissions,
    }))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<StatusCode> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;

    state.access_token_service.revoke(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<SubjectGrantsResponse>>> {
    let permissions = state
        .permission_resolver
        .resolve_for_user(identity.user_id())
        .await?
        .into_iter()
        .map(SubjectGrantsResponse::from)
        .collect();

    Ok(Json(permissions))
}
