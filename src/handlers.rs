use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use bcrypt::hash;
use log::{debug, info};
use uuid::Uuid;

use crate::db::{UserRecord, UserStore};
use crate::error::AppError;
use crate::extract::ValidJson;
use crate::models::{Tweet, User, UserLogin, UserRegister};
use crate::routes::{self, RouteDoc};

/// Shared state handed to every handler.
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub bcrypt_cost: u32,
}

/// Registers every route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(route_docs)
    .service(signup)
    .service(login)
    .service(list_users)
    .service(show_user)
    .service(update_user)
    .service(delete_user)
    .service(home)
    .service(post_tweet)
    .service(show_tweet)
    .service(update_tweet)
    .service(delete_tweet);
}

fn not_implemented(route: &'static RouteDoc, req: &HttpRequest) -> Result<HttpResponse, AppError> {
    debug!("{} {} hit an unimplemented route", req.method(), req.path());
    Err(AppError::NotImplemented(route))
}

#[get("/routes")]
pub async fn route_docs() -> HttpResponse {
    HttpResponse::Ok().json(routes::ROUTES)
}

// Users

#[post("/signup")]
pub async fn signup(
    state: web::Data<AppState>,
    payload: ValidJson<UserRegister>,
) -> Result<HttpResponse, AppError> {
    let registration = payload.into_inner();

    let store = state.store.clone();
    let cost = state.bcrypt_cost;
    let user: User = web::block(move || -> Result<User, AppError> {
        let password = hash(registration.credentials.password.as_bytes(), cost)?;
        let record = UserRecord::from_registration(registration, password);
        Ok(store.create(record)?.into())
    })
    .await??;

    info!("User signed up: {}", user.identity.user_id);
    Ok(HttpResponse::Created().json(user))
}

#[post("/login")]
pub async fn login(
    req: HttpRequest,
    _payload: ValidJson<UserLogin>,
) -> Result<HttpResponse, AppError> {
    not_implemented(&routes::LOGIN, &req)
}

#[get("/users")]
pub async fn list_users(req: HttpRequest) -> Result<HttpResponse, AppError> {
    not_implemented(&routes::LIST_USERS, &req)
}

#[get("/users/{user_id}")]
pub async fn show_user(
    req: HttpRequest,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    debug!("Show user {}", user_id);
    not_implemented(&routes::SHOW_USER, &req)
}

#[put("/users/{user_id}/update")]
pub async fn update_user(
    req: HttpRequest,
    user_id: web::Path<Uuid>,
    _payload: ValidJson<User>,
) -> Result<HttpResponse, AppError> {
    debug!("Update user {}", user_id);
    not_implemented(&routes::UPDATE_USER, &req)
}

#[delete("/users/{user_id}/delete")]
pub async fn delete_user(
    req: HttpRequest,
    user_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    debug!("Delete user {}", user_id);
    not_implemented(&routes::DELETE_USER, &req)
}

// Tweets

#[get("/")]
pub async fn home(req: HttpRequest) -> Result<HttpResponse, AppError> {
    not_implemented(&routes::HOME, &req)
}

#[post("/post")]
pub async fn post_tweet(
    req: HttpRequest,
    _payload: ValidJson<Tweet>,
) -> Result<HttpResponse, AppError> {
    not_implemented(&routes::POST_TWEET, &req)
}

#[get("/tweets/{tweet_id}")]
pub async fn show_tweet(
    req: HttpRequest,
    tweet_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    debug!("Show tweet {}", tweet_id);
    not_implemented(&routes::SHOW_TWEET, &req)
}

#[put("/tweets/{tweet_id}/update")]
pub async fn update_tweet(
    req: HttpRequest,
    tweet_id: web::Path<Uuid>,
    _payload: ValidJson<Tweet>,
) -> Result<HttpResponse, AppError> {
    debug!("Update tweet {}", tweet_id);
    not_implemented(&routes::UPDATE_TWEET, &req)
}

#[delete("/tweets/{tweet_id}/delete")]
pub async fn delete_tweet(
    req: HttpRequest,
    tweet_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    debug!("Delete tweet {}", tweet_id);
    not_implemented(&routes::DELETE_TWEET, &req)
}
