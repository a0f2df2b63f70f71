use rocket::{State, get, post, put, delete, http::{ContentType, Status}, serde::json::Json, data::{Data, ToByteUnit}};
use tracing::{error, debug, instrument};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::collections::HashSet;
use ring::rand::{SecureRandom, SystemRandom};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use time::Duration;
use shared::{models::*, user_info::AuthUser, validation, UploadError};
use crate::{
    auth::{Admin, CsrfHeader},
    config::AppConfig,
    controller::PhaseController,
    error::{ApiError, ApiResult},
    images::ImageStore,
    processor::ContestProcessor,
    rate_limiter::RateLimiter,
    store::ContestStore,
    utils::{parse_costume_id, rate_limit_key},
};

const VOTE_MAX_ATTEMPTS: u32 = 5;
const COSTUME_MAX_ATTEMPTS: u32 = 3;
const LIMIT_WINDOW_SECONDS: i64 = 60;
const MAX_TOKENS: usize = 10000;

pub struct CsrfGuard {
    tokens: Mutex<HashSet<String>>,
    rng: SystemRandom,
}

impl CsrfGuard {
    fn new() -> Self {
        Self {
            tokens: Mutex::new(HashSet::new()),
            rng: SystemRandom::new(),
        }
    }

    fn cleanup_old_tokens(&self) {
        if let Ok(mut tokens) = self.tokens.lock() {
            if tokens.len() > MAX_TOKENS {
                tokens.clear();
            }
        }
    }

    pub fn generate_token(&self) -> Result<String, Status> {
        self.cleanup_old_tokens();
        let mut bytes = [0u8; 32];
        self.rng.fill(&mut bytes).map_err(|_| Status::InternalServerError)?;
        let token = URL_SAFE_NO_PAD.encode(bytes);
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(token.clone());
            debug!("Generated new CSRF token");
            Ok(token)
        } else {
            error!("Failed to acquire lock for token storage");
            Err(Status::InternalServerError)
        }
    }

    fn verify_token(&self, token: &str) -> Result<(), Status> {
        let mut tokens = self.tokens.lock().map_err(|_| Status::InternalServerError)?;
        if !tokens.remove(token) {
            debug!("CSRF token validation failed. Token not found or already used.");
            return Err(Status::Forbidden);
        }
        debug!("CSRF token validated successfully");
        Ok(())
    }

    /// Consumes `token`; on failure the error carries a fresh token.
    pub fn check(&self, token: &str) -> ApiResult<()> {
        debug!("Validating CSRF token: length={}", token.len());
        if self.verify_token(token).is_ok() {
            return Ok(());
        }
        match self.generate_token() {
            Ok(new_token) => Err(ApiError::Csrf(new_token)),
            Err(_) => Err(ApiError::Internal("Failed to generate new CSRF token".into())),
        }
    }
}

pub struct AppState {
    pub store: Arc<dyn ContestStore>,
    pub images: Arc<dyn ImageStore>,
    pub config: AppConfig,
    pub vote_limiter: RateLimiter,
    pub costume_limiter: RateLimiter,
    pub csrf: CsrfGuard,
}

impl AppState {
    pub fn new(store: Arc<dyn ContestStore>, images: Arc<dyn ImageStore>, config: AppConfig) -> Self {
        Self {
            store,
            images,
            config,
            vote_limiter: RateLimiter::new(VOTE_MAX_ATTEMPTS, Duration::seconds(LIMIT_WINDOW_SECONDS)),
            costume_limiter: RateLimiter::new(COSTUME_MAX_ATTEMPTS, Duration::seconds(LIMIT_WINDOW_SECONDS)),
            csrf: CsrfGuard::new(),
        }
    }

    fn present(&self, mut costume: Costume) -> Costume {
        costume.image_url = costume.image_url
            .map(|url| validation::resolve_image_url(&url, &self.config.image_public_base));
        costume
    }
}

#[get("/csrf-token")]
pub async fn get_csrf_token(state: &State<AppState>) -> Result<String, Status> {
    state.csrf.generate_token()
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[get("/contest")]
pub async fn get_contest(state: &State<AppState>, user: AuthUser) -> ApiResult<Json<ContestOverview>> {
    let settings = ContestProcessor::ensure_settings(state.store.as_ref()).await?;
    let costumes = state.store.list_costumes().await?
        .into_iter()
        .map(|c| state.present(c))
        .collect();

    Ok(Json(ContestOverview {
        phase: settings.phase(),
        settings,
        costumes,
        is_admin: state.config.is_admin(&user),
    }))
}

#[get("/results")]
pub async fn get_results(state: &State<AppState>, user: AuthUser) -> ApiResult<Json<ResultsBoard>> {
    let is_admin = state.config.is_admin(&user);
    let mut board = ContestProcessor::results(state.store.as_ref(), is_admin).await?;
    for result in &mut board.results {
        result.costume = state.present(result.costume.clone());
    }
    Ok(Json(board))
}

#[get("/vote/mine")]
pub async fn get_my_vote(state: &State<AppState>, user: AuthUser) -> ApiResult<Json<Option<Vote>>> {
    ContestProcessor::my_vote(state.store.as_ref(), &user).await.map(Json)
}

#[instrument(skip(state, request), fields(costume_id = %request.costume_id))]
#[post("/vote", format = "json", data = "<request>")]
pub async fn cast_vote(
    state: &State<AppState>,
    request: Json<CastVoteRequest>,
    user: AuthUser,
) -> ApiResult<Json<Vote>> {
    let request = request.into_inner();
    state.csrf.check(&request.csrf_token)?;
    state.vote_limiter.check_rate_limit(&rate_limit_key("cast_vote", &user.id))?;

    ContestProcessor::cast_vote(state.store.as_ref(), &user, request.costume_id)
        .await
        .map(Json)
}

#[instrument(skip(state, request))]
#[post("/costume", format = "json", data = "<request>")]
pub async fn submit_costume(
    state: &State<AppState>,
    request: Json<SubmitCostumeRequest>,
    user: AuthUser,
) -> ApiResult<Json<Costume>> {
    let request = request.into_inner();
    state.csrf.check(&request.csrf_token)?;
    state.costume_limiter.check_rate_limit(&rate_limit_key("costume", &user.id))?;

    let costume = ContestProcessor::submit_costume(state.store.as_ref(), &user, &request.name, &request.description).await?;
    Ok(Json(state.present(costume)))
}

#[instrument(skip(state, request))]
#[put("/costume/<id>", format = "json", data = "<request>")]
pub async fn update_costume(
    state: &State<AppState>,
    id: &str,
    request: Json<SubmitCostumeRequest>,
    user: AuthUser,
) -> ApiResult<Json<Costume>> {
    let id = parse_costume_id(id)?;
    let request = request.into_inner();
    state.csrf.check(&request.csrf_token)?;

    let costume = ContestProcessor::update_costume(state.store.as_ref(), &user, id, &request.name, &request.description).await?;
    Ok(Json(state.present(costume)))
}

#[instrument(skip(state, request))]
#[delete("/costume/<id>", format = "json", data = "<request>")]
pub async fn delete_costume(
    state: &State<AppState>,
    id: &str,
    request: Json<AdminActionRequest>,
    user: AuthUser,
) -> ApiResult<Status> {
    let id = parse_costume_id(id)?;
    state.csrf.check(&request.csrf_token)?;

    let is_admin = state.config.is_admin(&user);
    ContestProcessor::delete_costume(state.store.as_ref(), state.images.as_ref(), &user, id, is_admin).await?;
    Ok(Status::NoContent)
}

#[instrument(skip(state, data, csrf))]
#[post("/costume/image", data = "<data>")]
pub async fn upload_image(
    state: &State<AppState>,
    user: AuthUser,
    content_type: Option<&ContentType>,
    csrf: CsrfHeader,
    data: Data<'_>,
) -> ApiResult<Json<Costume>> {
    state.csrf.check(&csrf.0)?;
    state.costume_limiter.check_rate_limit(&rate_limit_key("costume", &user.id))?;

    let bytes = data.open(validation::MAX_IMAGE_BYTES.bytes())
        .into_bytes()
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !bytes.is_complete() {
        return Err(UploadError::TooLarge.into());
    }

    let content_type = content_type.map(|ct| ct.to_string()).unwrap_or_default();
    let costume = ContestProcessor::upload_image(
        state.store.as_ref(),
        state.images.as_ref(),
        &user,
        &content_type,
        bytes.into_inner(),
    ).await?;
    Ok(Json(state.present(costume)))
}

#[get("/<path..>")]
pub async fn get_image(state: &State<AppState>, path: PathBuf) -> ApiResult<(ContentType, Vec<u8>)> {
    let key = path.iter()
        .map(|segment| segment.to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if validation::storage_key(&key).is_none() {
        return Err(ApiError::Store(crate::store::StoreError::NotFound));
    }

    let bytes = state.images.get(&key).await?
        .ok_or(ApiError::Store(crate::store::StoreError::NotFound))?;
    let content_type = path.extension()
        .and_then(|ext| ContentType::from_extension(&ext.to_string_lossy()))
        .unwrap_or(ContentType::Binary);
    Ok((content_type, bytes))
}

#[post("/admin/voting", format = "json", data = "<request>")]
pub async fn toggle_voting(state: &State<AppState>, admin: Admin, request: Json<ToggleRequest>) -> ApiResult<Json<ContestSettings>> {
    state.csrf.check(&request.csrf_token)?;
    PhaseController::toggle_voting(state.store.as_ref(), &admin.0.id, request.enabled).await.map(Json)
}

#[post("/admin/results", format = "json", data = "<request>")]
pub async fn toggle_results(state: &State<AppState>, admin: Admin, request: Json<ToggleRequest>) -> ApiResult<Json<ContestSettings>> {
    state.csrf.check(&request.csrf_token)?;
    PhaseController::toggle_results(state.store.as_ref(), &admin.0.id, request.enabled).await.map(Json)
}

#[post("/admin/self-vote", format = "json", data = "<request>")]
pub async fn toggle_self_vote(state: &State<AppState>, admin: Admin, request: Json<ToggleRequest>) -> ApiResult<Json<ContestSettings>> {
    state.csrf.check(&request.csrf_token)?;
    PhaseController::toggle_self_vote(state.store.as_ref(), &admin.0.id, request.enabled).await.map(Json)
}

#[post("/admin/revote/start", format = "json", data = "<request>")]
pub async fn start_revote(state: &State<AppState>, admin: Admin, request: Json<StartRevoteRequest>) -> ApiResult<Json<ContestSettings>> {
    let request = request.into_inner();
    state.csrf.check(&request.csrf_token)?;
    PhaseController::start_revote(state.store.as_ref(), &admin.0.id, request.scope).await.map(Json)
}

#[post("/admin/revote/end", format = "json", data = "<request>")]
pub async fn end_revote(state: &State<AppState>, admin: Admin, request: Json<AdminActionRequest>) -> ApiResult<Json<ContestSettings>> {
    state.csrf.check(&request.csrf_token)?;
    PhaseController::end_revote(state.store.as_ref(), &admin.0.id).await.map(Json)
}

#[post("/admin/reset", format = "json", data = "<request>")]
pub async fn reset_contest(state: &State<AppState>, admin: Admin, request: Json<AdminActionRequest>) -> ApiResult<Json<ResetReport>> {
    state.csrf.check(&request.csrf_token)?;
    PhaseController::reset_contest(state.store.as_ref(), state.images.as_ref(), &admin.0.id).await.map(Json)
}
