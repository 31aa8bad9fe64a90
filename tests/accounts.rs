//! Manual suspension lifecycle driven by administrators.

mod common;

use axum::http::StatusCode;
use serde_json::json;

#[tokio::test]
async fn ban_suspend_activate_round_trip() {
    let Some(app) = common::try_app().await else { return };
    let admin = app.create_admin("life_admin").await;
    let target = app.create_user("life_target").await;
    let path = format!("/admin/users/{}/action", target.id);

    let resp = app
        .post_json(
            &path,
            json!({ "action": "suspend", "reason": "cooling off" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["user"]["status"], "suspended");
    assert!(body["user"]["suspended_until"].is_string());
    // Manual suspension does not touch the score.
    assert_eq!(body["user"]["score"], 100);

    let resp = app
        .post_json(&path, json!({ "action": "activate" }), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["user"]["status"], "active");
    assert!(body["user"]["suspended_until"].is_null());

    let resp = app
        .post_json(
            &path,
            json!({ "action": "ban", "reason": "repeat abuse" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["user"]["status"], "banned");

    let (_, status, suspended_until) = app.user_standing(target.id).await;
    assert_eq!(status, "banned");
    assert!(suspended_until.is_none());

    app.drain_notifications().await;
    let mut kinds = app.notification_kinds(target.id).await;
    kinds.sort();
    assert_eq!(
        kinds,
        vec!["account.activated", "account.banned", "account.suspended"]
    );
}

#[tokio::test]
async fn suspend_honors_a_custom_duration() {
    let Some(app) = common::try_app().await else { return };
    let admin = app.create_admin("dur_admin").await;
    let target = app.create_user("dur_target").await;

    let resp = app
        .post_json(
            &format!("/admin/users/{}/action", target.id),
            json!({ "action": "suspend", "duration": 30 }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let (_, _, suspended_until) = app.user_standing(target.id).await;
    let until = suspended_until.expect("deadline must be stamped");
    let days = (until - time::OffsetDateTime::now_utc()).whole_days();
    assert!((29..=30).contains(&days), "expected ~30 days, got {}", days);
}

#[tokio::test]
async fn non_positive_suspension_duration_is_rejected() {
    let Some(app) = common::try_app().await else { return };
    let admin = app.create_admin("baddur_admin").await;
    let target = app.create_user("baddur_target").await;
    let path = format!("/admin/users/{}/action", target.id);

    for duration in [0, -3] {
        let resp = app
            .post_json(
                &path,
                json!({ "action": "suspend", "duration": duration }),
                Some(&admin.token),
            )
            .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST);
        assert_eq!(resp.error_code(), "invalid_duration");
    }

    let (_, status, suspended_until) = app.user_standing(target.id).await;
    assert_eq!(status, "active");
    assert!(suspended_until.is_none());
}

#[tokio::test]
async fn ban_is_not_repeatable() {
    let Some(app) = common::try_app().await else { return };
    let admin = app.create_admin("reban_admin").await;
    let target = app.create_user("reban_target").await;
    let path = format!("/admin/users/{}/action", target.id);

    let resp = app
        .post_json(&path, json!({ "action": "ban" }), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .post_json(&path, json!({ "action": "ban" }), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "already_banned");
}

#[tokio::test]
async fn banned_user_must_be_activated_before_suspension() {
    let Some(app) = common::try_app().await else { return };
    let admin = app.create_admin("order_admin").await;
    let target = app.create_user("order_target").await;
    let path = format!("/admin/users/{}/action", target.id);

    app.set_standing(target.id, 100, "banned", None).await;

    let resp = app
        .post_json(&path, json!({ "action": "suspend" }), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "must_activate_first");
}

#[tokio::test]
async fn suspending_an_already_suspended_user_is_rejected() {
    let Some(app) = common::try_app().await else { return };
    let admin = app.create_admin("resus_admin").await;
    let target = app.create_user("resus_target").await;
    let path = format!("/admin/users/{}/action", target.id);

    let resp = app
        .post_json(&path, json!({ "action": "suspend" }), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app
        .post_json(&path, json!({ "action": "suspend" }), Some(&admin.token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "already_suspended");
}

#[tokio::test]
async fn admins_cannot_act_on_themselves_or_other_admins() {
    let Some(app) = common::try_app().await else { return };
    let admin = app.create_admin("self_admin").await;
    let peer = app.create_admin("peer_admin").await;

    let resp = app
        .post_json(
            &format!("/admin/users/{}/action", admin.id),
            json!({ "action": "ban" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "self_action");

    let resp = app
        .post_json(
            &format!("/admin/users/{}/action", peer.id),
            json!({ "action": "ban" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_code(), "target_is_admin");
}

#[tokio::test]
async fn acting_on_an_unknown_user_is_not_found() {
    let Some(app) = common::try_app().await else { return };
    let admin = app.create_admin("nf_user_admin").await;

    let resp = app
        .post_json(
            &format!("/admin/users/{}/action", uuid::Uuid::new_v4()),
            json!({ "action": "ban" }),
            Some(&admin.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_code(), "user_not_found");
}

#[tokio::test]
async fn user_actions_require_an_admin() {
    let Some(app) = common::try_app().await else { return };
    let user = app.create_user("acct_nonadmin").await;
    let target = app.create_user("acct_target").await;

    let resp = app
        .post_json(
            &format!("/admin/users/{}/action", target.id),
            json!({ "action": "ban" }),
            Some(&user.token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(resp.error_code(), "admin_required");
}
