use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};

use super::{search_query, PathParam, QueryParams};
use crate::db::UserRepository;
use crate::error::ApiError;
use crate::models::User;
use crate::pagination::{pagination_headers, search_pagination_headers, Pageable};
use crate::AppState;

/// GET /api/users, optionally restricted with `?authority=ROLE_X`
pub async fn get_all_users(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<User>>), ApiError> {
    let pageable = Pageable::from_params(&params, &[])?;
    let authority = params
        .iter()
        .find(|(key, _)| key == "authority")
        .map(|(_, value)| value.as_str());
    tracing::debug!("REST request to get all Users, authority: {:?}", authority);

    let mut conn = state.pool.acquire().await?;
    let mut repo = UserRepository::new(&mut conn);
    let page = match authority {
        Some(authority) => repo.find_all_by_authority(authority, &pageable).await?,
        None => repo.find_all(&pageable).await?,
    };
    Ok((pagination_headers(&page, "/api/users"), Json(page.content)))
}

/// GET /api/users/:login
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    PathParam(login): PathParam<String>,
) -> Result<Json<User>, ApiError> {
    tracing::debug!("REST request to get User : {}", login);
    let mut conn = state.pool.acquire().await?;
    UserRepository::new(&mut conn)
        .find_one_by_login(&login)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", login)))
}

/// GET /api/_search/users?query=
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    Query(params): QueryParams,
) -> Result<(HeaderMap, Json<Vec<User>>), ApiError> {
    let query = search_query(&params);
    let pageable = Pageable::from_params(&params, &[])?;
    tracing::debug!("REST request to search for a page of Users for query {}", query);

    let hits = state.search.search::<User>(&query, &pageable);
    let mut conn = state.pool.acquire().await?;
    let mut repo = UserRepository::new(&mut conn);
    let content = resolve_hits!(repo, hits);
    Ok((
        search_pagination_headers(&query, &hits, "/api/_search/users"),
        Json(content),
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};

    use crate::db::UserRepository;
    use crate::handlers::test_support::{send, test_app};
    use crate::models::{User, ROLE_CONSULTANT, ROLE_USER};
    use crate::AppState;

    async fn seed_users(state: &Arc<AppState>) {
        let mut conn = state.pool.acquire().await.unwrap();
        let mut repo = UserRepository::new(&mut conn);
        for (login, authority) in [("drwho", ROLE_CONSULTANT), ("clerk", ROLE_USER)] {
            let mut user = User::new(login);
            user.last_name = Some(format!("{} surname", login));
            user.password_hash = "hash".to_string();
            user.add_authority(authority);
            let id = repo.insert(&user).await.unwrap();
            user.id = Some(id);
            state.search.index(&user);
        }
    }

    #[tokio::test]
    async fn test_list_users_by_authority() {
        let (app, state) = test_app().await;
        seed_users(&state).await;

        let (status, headers, body) = send(&app, Method::GET, "/api/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get("X-Total-Count").unwrap(), "2");
        assert!(body[0].get("passwordHash").is_none());

        let (_, headers, body) =
            send(&app, Method::GET, "/api/users?authority=ROLE_CONSULTANT", None).await;
        assert_eq!(headers.get("X-Total-Count").unwrap(), "1");
        assert_eq!(body[0]["login"], "drwho");
    }

    #[tokio::test]
    async fn test_get_and_search_user() {
        let (app, state) = test_app().await;
        seed_users(&state).await;

        let (status, _, body) = send(&app, Method::GET, "/api/users/DrWho", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authorities"][0], "ROLE_CONSULTANT");

        let (status, _, _) = send(&app, Method::GET, "/api/users/nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, body) =
            send(&app, Method::GET, "/api/_search/users?query=clerk", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["login"], "clerk");
    }
}
