use std::time::Duration;

use course_core::{CourseId, CourseSummary, FormSnapshot};
use course_logging::{course_debug, course_info};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::{ApiError, AuthSession, Course, Credentials, FailureKind};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Generation runs synchronously on the server, so this is long.
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(600),
        }
    }
}

/// The course backend as the rest of the application sees it.
#[async_trait::async_trait]
pub trait CourseApi: Send + Sync {
    async fn register(&self, credentials: &Credentials) -> Result<AuthSession, ApiError>;
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError>;
    async fn list_courses(&self) -> Result<Vec<CourseSummary>, ApiError>;
    /// Runs a generation to the end and returns the produced course.
    async fn submit_generation(&self, form: &FormSnapshot) -> Result<CourseId, ApiError>;
    async fn fetch_course(&self, course_id: CourseId) -> Result<Course, ApiError>;
    async fn delete_course(&self, course_id: CourseId) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    course_id: Option<CourseId>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoursesBody {
    #[serde(default)]
    courses: Vec<CourseSummary>,
}

#[derive(Debug, Clone)]
pub struct ReqwestCourseApi {
    base_url: Url,
    client: reqwest::Client,
    token: Option<String>,
}

impl ReqwestCourseApi {
    pub fn new(settings: &ApiSettings, token: Option<String>) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            base_url,
            client,
            token,
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        self.authorized(request)
            .send()
            .await
            .map_err(map_reqwest_error)
    }

    async fn authenticate(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<AuthSession, ApiError> {
        let response = self
            .send(self.client.post(self.url(path)?).json(credentials))
            .await?;
        let session: AuthSession = decode(expect_success(response).await?).await?;
        course_info!("Authenticated as {}", session.username);
        Ok(session)
    }
}

#[async_trait::async_trait]
impl CourseApi for ReqwestCourseApi {
    async fn register(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        self.authenticate("register", credentials).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        self.authenticate("login", credentials).await
    }

    async fn list_courses(&self) -> Result<Vec<CourseSummary>, ApiError> {
        let response = self.send(self.client.get(self.url("api/courses")?)).await?;
        let body: CoursesBody = decode(expect_success(response).await?).await?;
        course_debug!("Listed {} courses", body.courses.len());
        Ok(body.courses)
    }

    async fn submit_generation(&self, form: &FormSnapshot) -> Result<CourseId, ApiError> {
        let response = self
            .send(self.client.post(self.url("api/generate")?).json(form))
            .await?;

        let status = response.status();
        if let Some(err) = auth_or_missing(status) {
            return Err(err);
        }
        let text = response.text().await.map_err(map_reqwest_error)?;
        let body: GenerateBody = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(ApiError::new(
                    FailureKind::HttpStatus(status.as_u16()),
                    status.to_string(),
                ))
            }
            Err(err) => return Err(ApiError::new(FailureKind::Decode, err.to_string())),
        };

        match (body.success, body.course_id) {
            (true, Some(course_id)) if status.is_success() => Ok(course_id),
            _ => Err(ApiError::new(
                FailureKind::Rejected,
                body.message
                    .unwrap_or_else(|| format!("generation failed ({status})")),
            )),
        }
    }

    async fn fetch_course(&self, course_id: CourseId) -> Result<Course, ApiError> {
        let response = self
            .send(self.client.get(self.url(&format!("api/course/{course_id}"))?))
            .await?;
        decode(expect_success(response).await?).await
    }

    async fn delete_course(&self, course_id: CourseId) -> Result<(), ApiError> {
        let response = self
            .send(
                self.client
                    .delete(self.url(&format!("api/courses/{course_id}"))?),
            )
            .await?;
        expect_success(response).await?;
        course_info!("Deleted course {}", course_id);
        Ok(())
    }
}

fn auth_or_missing(status: StatusCode) -> Option<ApiError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::UNPROCESSABLE_ENTITY => {
            Some(ApiError::new(FailureKind::Unauthorized, status.to_string()))
        }
        StatusCode::NOT_FOUND => Some(ApiError::new(FailureKind::NotFound, status.to_string())),
        _ => None,
    }
}

async fn expect_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .json::<MessageBody>()
        .await
        .ok()
        .and_then(|body| body.message.or(body.error))
        .unwrap_or_else(|| status.to_string());

    Err(match auth_or_missing(status) {
        Some(err) => ApiError::new(err.kind, message),
        None => ApiError::new(FailureKind::HttpStatus(status.as_u16()), message),
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
