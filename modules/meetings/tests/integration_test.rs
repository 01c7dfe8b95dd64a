//! Meetings against a real SQLite database and the REST router.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use meetings::api::rest::routes::register_routes;
use meetings::contract::model::{AttendanceCommand, CalendarDate, MeetingKey};
use meetings::domain::codes::RandomCodeGenerator;
use meetings::domain::dates::DateNormalizer;
use meetings::domain::error::DomainError;
use meetings::domain::ports::UserDirectory;
use meetings::domain::repo::{
    AppendOutcome, CloseOutcome, InsertOutcome, MeetingFields, MeetingsRepository, NewMeeting,
    UpdateOutcome, Visibility,
};
use meetings::domain::service::{Service, ServiceConfig};
use meetings::infra::storage::{migrations::Migrator, sea_orm_repo::SeaOrmMeetingsRepository};
use meetings::infra::user_directory::AccountsUserDirectory;
use modkit::{AuthError, AuthGate, Caller, ADMIN_ROLE};
use modkit_db::{ConnectOpts, DbHandle};

type Repo = SeaOrmMeetingsRepository<DatabaseConnection>;

async fn open_db() -> DbHandle {
    let db = DbHandle::connect("sqlite::memory:", ConnectOpts::default())
        .await
        .expect("open sqlite");
    Migrator::up(db.seaorm(), None).await.expect("migrate");
    db
}

async fn repo() -> Arc<Repo> {
    let db = open_db().await;
    Arc::new(SeaOrmMeetingsRepository::new(db.sea()))
}

fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
}

fn new_meeting(date: DateTime<Utc>, code: &str) -> NewMeeting {
    NewMeeting {
        id: Uuid::new_v4(),
        date,
        code: code.to_string(),
        created_at: Utc::now(),
    }
}

async fn inserted(repo: &Repo, date: DateTime<Utc>, code: &str) -> Uuid {
    match repo.insert(new_meeting(date, code)).await.unwrap() {
        InsertOutcome::Inserted(m) => m.id,
        other => panic!("insert failed: {other:?}"),
    }
}

#[tokio::test]
async fn active_dates_and_codes_are_unique() {
    let repo = repo().await;
    let first = inserted(&repo, midnight(2025, 1, 1), "aaaa0001").await;

    assert!(matches!(
        repo.insert(new_meeting(midnight(2025, 1, 1), "bbbb0001")).await.unwrap(),
        InsertOutcome::DateTaken
    ));
    assert!(matches!(
        repo.insert(new_meeting(midnight(2025, 1, 2), "aaaa0001")).await.unwrap(),
        InsertOutcome::CodeTaken
    ));

    let deleted = MeetingFields {
        deleted_at: Some(Some(Utc::now())),
        ..Default::default()
    };
    assert!(matches!(
        repo.update_fields(first, deleted).await.unwrap(),
        UpdateOutcome::Updated(_)
    ));

    // Soft-deleted rows no longer hold their keys.
    let second = inserted(&repo, midnight(2025, 1, 1), "aaaa0001").await;
    assert_ne!(first, second);

    let revive = MeetingFields {
        deleted_at: Some(None),
        ..Default::default()
    };
    assert!(matches!(
        repo.update_fields(first, revive).await.unwrap(),
        UpdateOutcome::DateTaken
    ));
    assert!(matches!(
        repo.update_fields(Uuid::new_v4(), MeetingFields::default()).await.unwrap(),
        UpdateOutcome::NotFound
    ));

    assert!(repo
        .find_by_id(first, Visibility::ActiveOnly)
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .find_by_id(first, Visibility::IncludeDeleted)
        .await
        .unwrap()
        .is_some());
    assert_eq!(
        repo.find_by_code("aaaa0001", None).await.unwrap().unwrap().id,
        second
    );
    assert!(repo.find_by_code("aaaa0001", Some(second)).await.unwrap().is_none());
}

#[tokio::test]
async fn list_is_newest_first_with_attendance() {
    let repo = repo().await;
    let user = Uuid::new_v4();
    let older = inserted(&repo, midnight(2025, 2, 1), "older001").await;
    let newer = inserted(&repo, midnight(2025, 3, 1), "newer001").await;
    let gone = inserted(&repo, midnight(2025, 4, 1), "gone0001").await;
    repo.append_attendance(older, user, Utc::now()).await.unwrap();
    repo.update_fields(
        gone,
        MeetingFields {
            deleted_at: Some(Some(Utc::now())),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let active = repo.list(Visibility::ActiveOnly).await.unwrap();
    let ids: Vec<Uuid> = active.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![newer, older]);
    assert_eq!(active[1].attendance.len(), 1);
    assert!(active[0].attendance.is_empty());

    let all = repo.list(Visibility::IncludeDeleted).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, gone);
}

#[tokio::test]
async fn one_open_interval_per_user() {
    let repo = repo().await;
    let meeting = inserted(&repo, midnight(2025, 5, 1), "open0001").await;
    let ann = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let t0 = Utc::now();

    assert!(matches!(
        repo.append_attendance(meeting, ann, t0).await.unwrap(),
        AppendOutcome::Appended(_)
    ));
    assert!(matches!(
        repo.append_attendance(meeting, ann, t0 + Duration::seconds(1)).await.unwrap(),
        AppendOutcome::ActiveExists
    ));
    assert!(matches!(
        repo.append_attendance(meeting, bob, t0).await.unwrap(),
        AppendOutcome::Appended(_)
    ));

    match repo
        .close_attendance(meeting, ann, t0 + Duration::minutes(5))
        .await
        .unwrap()
    {
        CloseOutcome::Closed(interval) => {
            assert_eq!(interval.user_id, ann);
            assert!(interval.end_time.is_some());
        }
        CloseOutcome::NoneOpen => panic!("ann had an open interval"),
    }
    assert!(matches!(
        repo.close_attendance(meeting, ann, t0).await.unwrap(),
        CloseOutcome::NoneOpen
    ));
    assert!(matches!(
        repo.append_attendance(meeting, ann, t0 + Duration::minutes(10)).await.unwrap(),
        AppendOutcome::Appended(_)
    ));

    let stored = repo
        .find_by_id(meeting, Visibility::ActiveOnly)
        .await
        .unwrap()
        .unwrap();
    let owners: Vec<Uuid> = stored.attendance.iter().map(|a| a.user_id).collect();
    assert_eq!(owners, vec![ann, bob, ann]);
    assert_eq!(stored.open_intervals_of(ann).count(), 1);
    assert_eq!(stored.open_intervals_of(bob).count(), 1);
}

#[tokio::test]
async fn attendance_needs_a_live_meeting() {
    let repo = repo().await;
    let meeting = inserted(&repo, midnight(2025, 6, 1), "live0001").await;
    repo.update_fields(
        meeting,
        MeetingFields {
            deleted_at: Some(Some(Utc::now())),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        repo.append_attendance(meeting, Uuid::new_v4(), Utc::now()).await.unwrap(),
        AppendOutcome::MeetingGone
    ));
    assert!(matches!(
        repo.append_attendance(Uuid::new_v4(), Uuid::new_v4(), Utc::now()).await.unwrap(),
        AppendOutcome::MeetingGone
    ));
}

#[tokio::test]
async fn concurrent_starts_yield_one_interval() {
    let repo = repo().await;
    let meeting = inserted(&repo, midnight(2025, 7, 1), "race0001").await;
    let user = Uuid::new_v4();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.append_attendance(meeting, user, Utc::now()).await })
        })
        .collect();
    let mut appended = 0;
    for t in tasks {
        if let AppendOutcome::Appended(_) = t.await.unwrap().unwrap() {
            appended += 1;
        }
    }
    assert_eq!(appended, 1);

    let closers: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.close_attendance(meeting, user, Utc::now()).await })
        })
        .collect();
    let mut closed = 0;
    for t in closers {
        if let CloseOutcome::Closed(_) = t.await.unwrap().unwrap() {
            closed += 1;
        }
    }
    assert_eq!(closed, 1);
}

/// Service wired to the real accounts module sharing the same database.
#[tokio::test]
async fn attendance_resolves_users_through_accounts() {
    use accounts::contract::model::NewUser;
    use accounts::gateways::local::AccountsLocalClient;

    let db = open_db().await;
    accounts::infra::storage::migrations::Migrator::up(db.seaorm(), None)
        .await
        .expect("accounts migrate");
    let accounts_svc = Arc::new(accounts::domain::service::Service::new(
        Arc::new(accounts::infra::storage::sea_orm_repo::SeaOrmUsersRepository::new(db.sea())),
        Arc::new(accounts::infra::password::Argon2Hasher::default()),
        Arc::new(accounts::infra::jwt::JwtIssuer::new(b"meetings-it")),
        accounts::domain::service::ServiceConfig::default(),
    ));
    let ann = accounts_svc
        .register(NewUser {
            username: "ann".into(),
            email: "ann@example.com".into(),
            password: "password-123".into(),
        })
        .await
        .unwrap();

    let svc = Service::new(
        Arc::new(SeaOrmMeetingsRepository::new(db.sea())),
        Arc::new(AccountsUserDirectory::new(Arc::new(AccountsLocalClient::new(
            accounts_svc,
        )))),
        Arc::new(RandomCodeGenerator),
        DateNormalizer::new(chrono_tz::Europe::Lisbon),
        ServiceConfig::default(),
    );

    let date = CalendarDate::Day(NaiveDate::from_ymd_opt(2025, 10, 26).unwrap());
    let meeting = svc.create_meeting(date).await.unwrap();
    // Lisbon is on UTC+1 until 01:00 UTC that day.
    assert_eq!(meeting.date, Utc.with_ymd_and_hms(2025, 10, 25, 23, 0, 0).unwrap());

    let cmd = |user_id| AttendanceCommand {
        meeting: MeetingKey::Id(meeting.id),
        user_id,
        meeting_code: Some(meeting.code.clone()),
    };
    svc.start_attendance(cmd(ann.id)).await.unwrap();
    svc.finish_attendance(cmd(ann.id)).await.unwrap();

    let stranger = Uuid::new_v4();
    assert_eq!(
        svc.start_attendance(cmd(stranger)).await.unwrap_err(),
        DomainError::UserNotFound { user_id: stranger }
    );

    let mine = svc.attendance_of(&MeetingKey::Id(meeting.id), ann.id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert!(mine[0].end_time.is_some());
}

struct StaticGate;

const ADMIN_ID: u128 = 100;
const USER_ID: u128 = 1;

#[async_trait]
impl AuthGate for StaticGate {
    async fn resolve(&self, bearer_token: &str) -> Result<Caller, AuthError> {
        match bearer_token {
            "admin-token" => Ok(Caller {
                user_id: Uuid::from_u128(ADMIN_ID),
                roles: BTreeSet::from([ADMIN_ROLE.to_string()]),
            }),
            "user-token" => Ok(Caller {
                user_id: Uuid::from_u128(USER_ID),
                roles: BTreeSet::new(),
            }),
            other => Err(AuthError::InvalidToken(other.to_string())),
        }
    }
}

struct KnownUsers(HashSet<Uuid>);

#[async_trait]
impl UserDirectory for KnownUsers {
    async fn user_exists(&self, user_id: Uuid) -> anyhow::Result<bool> {
        Ok(self.0.contains(&user_id))
    }
}

async fn rest_app() -> Router {
    let db = open_db().await;
    let svc = Arc::new(Service::new(
        Arc::new(SeaOrmMeetingsRepository::new(db.sea())),
        Arc::new(KnownUsers(HashSet::from([
            Uuid::from_u128(ADMIN_ID),
            Uuid::from_u128(USER_ID),
        ]))),
        Arc::new(RandomCodeGenerator),
        DateNormalizer::new(chrono_tz::UTC),
        ServiceConfig::default(),
    ));
    let gate: Arc<dyn AuthGate> = Arc::new(StaticGate);
    register_routes(Router::new(), svc, gate).unwrap()
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn rest_create_is_admin_only_and_reports_duplicates() {
    let app = rest_app().await;
    let body = json!({ "date": "2025-10-26" });

    let (status, _) = call(&app, Method::POST, "/meetings", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&app, Method::POST, "/meetings", Some("user-token"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = call(&app, Method::POST, "/meetings", Some("admin-token"), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["code"].as_str().unwrap().len(), 8);
    assert_eq!(created["attendance"], json!([]));

    let (status, problem) = call(&app, Method::POST, "/meetings", Some("admin-token"), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "MEETINGS_DUPLICATE");
    assert_eq!(problem["existing_meeting"]["id"], created["id"]);
    assert_eq!(problem["instance"], "/meetings");

    let (status, problem) = call(
        &app,
        Method::POST,
        "/meetings",
        Some("admin-token"),
        Some(json!({ "date": "26/10/2025" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["code"], "MEETINGS_VALIDATION");

    let (status, fetched) = call(&app, Method::GET, "/meetings/by-date/2025-10-26", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let code_uri = format!("/meetings/by-code/{}", created["code"].as_str().unwrap());
    let (status, fetched) = call(&app, Method::GET, &code_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], created["id"]);

    let (status, _) = call(&app, Method::GET, "/meetings/by-date/2030-01-01", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rest_attendance_flow() {
    let app = rest_app().await;
    let (_, created) = call(
        &app,
        Method::POST,
        "/meetings",
        Some("admin-token"),
        Some(json!({ "date": "2025-10-27" })),
    )
    .await;
    let by_date = json!({ "date": "2025-10-27" });

    let (status, _) = call(&app, Method::POST, "/meetings/attendance/start", None, Some(by_date.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, started) = call(
        &app,
        Method::POST,
        "/meetings/attendance/start",
        Some("user-token"),
        Some(by_date.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(started["user_id"], Uuid::from_u128(USER_ID).to_string());
    assert!(started["end_time"].is_null());

    let (status, problem) = call(
        &app,
        Method::POST,
        "/meetings/attendance/start",
        Some("user-token"),
        Some(by_date.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["code"], "MEETINGS_ATTENDANCE_ACTIVE");

    let (status, finished) = call(
        &app,
        Method::POST,
        "/meetings/attendance/finish",
        Some("user-token"),
        Some(by_date.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!finished["end_time"].is_null());

    let (status, problem) = call(
        &app,
        Method::POST,
        "/meetings/attendance/finish",
        Some("user-token"),
        Some(by_date),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(problem["code"], "MEETINGS_NO_ATTENDANCE");

    let for_admin = json!({ "meeting_id": created["id"], "user_id": Uuid::from_u128(ADMIN_ID).to_string() });
    let (status, _) = call(
        &app,
        Method::POST,
        "/meetings/attendance/start",
        Some("user-token"),
        Some(for_admin.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        Method::POST,
        "/meetings/attendance/start",
        Some("admin-token"),
        Some(json!({ "meeting_id": created["id"], "meeting_code": "wrong-code" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        Method::POST,
        "/meetings/attendance/start",
        Some("admin-token"),
        Some(for_admin),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn rest_admin_maintenance() {
    let app = rest_app().await;
    let (_, created) = call(
        &app,
        Method::POST,
        "/meetings",
        Some("admin-token"),
        Some(json!({ "date": "2025-12-01" })),
    )
    .await;
    let uri = format!("/meetings/{}", created["id"].as_str().unwrap());

    let (status, patched) = call(
        &app,
        Method::PATCH,
        &uri,
        Some("admin-token"),
        Some(json!({ "code": "standup" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["code"], "standup");

    let (status, problem) = call(&app, Method::PATCH, &uri, Some("admin-token"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(problem["detail"].as_str().unwrap().contains("no changes detected"));

    let (status, regenerated) = call(
        &app,
        Method::POST,
        "/meetings/by-date/2025-12-01/code",
        Some("admin-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(regenerated["code"], "standup");

    let (status, _) = call(&app, Method::DELETE, &uri, Some("user-token"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, Method::DELETE, &uri, Some("admin-token"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = call(&app, Method::GET, "/meetings", Some("admin-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 0);
    let (_, list) = call(&app, Method::GET, "/meetings?include_deleted=true", Some("admin-token"), None).await;
    assert_eq!(list["total"], 1);
    assert!(!list["meetings"][0]["deleted_at"].is_null());

    let recover_uri = format!("{uri}/recover");
    let (status, recovered) = call(&app, Method::POST, &recover_uri, Some("admin-token"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(recovered.get("deleted_at").is_none());
}
