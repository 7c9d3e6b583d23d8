mod common;

use axum::http::StatusCode;
use common::{SITE, TestApp, no_append_slash};
use site_redirects::application::services::{RedirectPhase, RedirectSettings};
use site_redirects::domain::entities::{NewRedirect, RedirectPatch, ResponseCode};
use site_redirects::domain::site_resolver::NO_SITE_MESSAGE;
use site_redirects::infrastructure::cache::MemoryCache;

#[tokio::test]
async fn test_exact_rule_without_append_slash() {
    let app = TestApp::new(no_append_slash());
    app.add(NewRedirect::new(SITE, "/en/a", "/en/b/")).await;
    let server = app.server();

    let response = server.get("/en/a").add_header("Host", "example.com").await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header("location"), "/en/b/");

    let response = server.get("/en/a/").add_header("Host", "example.com").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_rule_matches_request_without_trailing_slash() {
    let app = TestApp::new(RedirectSettings::default());
    let rule = app.add(NewRedirect::new(SITE, "/en/a", "/en/b/")).await;
    assert_eq!(rule.old_path, "/en/a/");
    let server = app.server();

    for path in ["/en/a", "/en/a/"] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header("location"), "/en/b/");
    }
}

#[tokio::test]
async fn test_query_string_is_carried_over() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/old/", "/new/").with_code(ResponseCode::Temporary))
        .await;
    let server = app.server();

    let response = server.get("/old/?x=1").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), "/new/?x=1");

    let response = server.get("/old/").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), "/new/");
}

#[tokio::test]
async fn test_external_target() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/away/", "https://example.org/landing/"))
        .await;

    let response = app.server().get("/away/?utm=1").await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        response.header("location"),
        "https://example.org/landing/?utm=1"
    );
}

#[tokio::test]
async fn test_gone_rule() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/retired/", "").with_code(ResponseCode::Gone))
        .await;

    let response = app.server().get("/retired/").await;
    response.assert_status(StatusCode::GONE);
    assert!(response.maybe_header("location").is_none());
}

#[tokio::test]
async fn test_empty_target_is_gone_whatever_the_code() {
    let app = TestApp::new(RedirectSettings::default());
    app.add_raw(NewRedirect::new(SITE, "/en/test-page/", "").with_code(ResponseCode::Temporary))
        .await;

    let response = app.server().get("/en/test-page/").await;
    response.assert_status(StatusCode::GONE);
}

#[tokio::test]
async fn test_escaped_rule_matches_decoded_and_encoded_requests() {
    let app = TestApp::new(no_append_slash());
    app.add(NewRedirect::new(SITE, "/path%20(escaped)/", "/en/b/"))
        .await;
    let server = app.server();

    for path in [
        "/path%20(escaped)/",
        "/path%20%28escaped%29/",
        "/path%20(escaped)",
    ] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header("location"), "/en/b/");
    }
}

#[tokio::test]
async fn test_non_ascii_rule() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/caf\u{e9}/", "/en/b/")).await;

    let response = app.server().get("/caf%C3%A9/").await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header("location"), "/en/b/");
}

#[tokio::test]
async fn test_decoded_target_is_reencoded_in_location() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/spaces/", "/new page/")).await;

    let response = app.server().get("/spaces/").await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header("location"), "/new%20page/");
}

#[tokio::test]
async fn test_catchall_ignores_remainder() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/blog/", "/news/").catchall())
        .await;
    let server = app.server();

    for path in ["/blog/", "/blog/2020/post/", "/blog/feed.xml"] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.header("location"), "/news/");
    }

    server.get("/blogger/").await.assert_status_not_found();
}

#[tokio::test]
async fn test_subpath_appends_remainder() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/docs/", "/help/").subpath())
        .await;

    let response = app.server().get("/docs/install/linux/?v=2").await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header("location"), "/help/install/linux/?v=2");
}

#[tokio::test]
async fn test_longest_prefix_wins() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/docs/", "/help/").subpath())
        .await;
    app.add(NewRedirect::new(SITE, "/docs/api/", "/reference/").subpath())
        .await;
    let server = app.server();

    let response = server.get("/docs/api/v1/").await;
    assert_eq!(response.header("location"), "/reference/v1/");

    let response = server.get("/docs/guide/").await;
    assert_eq!(response.header("location"), "/help/guide/");
}

#[tokio::test]
async fn test_exact_rule_beats_prefix_rule() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/docs/", "/help/").catchall())
        .await;
    app.add(NewRedirect::new(SITE, "/docs/faq/", "/faq/")).await;

    let response = app.server().get("/docs/faq/").await;
    assert_eq!(response.header("location"), "/faq/");
}

#[tokio::test]
async fn test_query_rules_only_when_enabled() {
    let settings = RedirectSettings {
        match_query: true,
        ..Default::default()
    };
    let app = TestApp::new(settings);
    app.add(NewRedirect::new(SITE, "/shop/?id=5", "/product/5/"))
        .await;
    let server = app.server();

    let response = server.get("/shop/?id=5").await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header("location"), "/product/5/");

    server.get("/shop/?id=6").await.assert_status_not_found();

    app.engine().replace_settings(RedirectSettings::default());
    server.get("/shop/?id=5").await.assert_status_not_found();
}

#[tokio::test]
async fn test_unmatched_request_reaches_pages() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/old/", "/new/")).await;
    let server = app.server();

    let response = server.get("/en/").await;
    response.assert_status_ok();
    response.assert_text("home");

    server.get("/nowhere/").await.assert_status_not_found();
}

#[tokio::test]
async fn test_request_phase_redirects_existing_page() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/en/test-page/", "/en/b/").with_code(ResponseCode::Temporary))
        .await;

    let response = app.server().get("/en/test-page/").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), "/en/b/");
}

#[tokio::test]
async fn test_response_phase_only_consults_not_found() {
    let settings = RedirectSettings {
        phase: RedirectPhase::Response,
        ..Default::default()
    };
    let app = TestApp::new(settings);
    app.add(NewRedirect::new(SITE, "/en/test-page/", "/en/b/").with_code(ResponseCode::Temporary))
        .await;
    app.add(NewRedirect::new(SITE, "/missing/", "/en/b/").with_code(ResponseCode::Temporary))
        .await;
    let server = app.server();

    let response = server.get("/en/test-page/").await;
    response.assert_status_ok();
    response.assert_text("test page");

    let response = server.get("/missing/").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), "/en/b/");
}

#[tokio::test]
async fn test_response_phase_every_response() {
    let settings = RedirectSettings {
        phase: RedirectPhase::Response,
        not_found_only: false,
        ..Default::default()
    };
    let app = TestApp::new(settings);
    app.add(NewRedirect::new(SITE, "/en/test-page/", "/en/b/").with_code(ResponseCode::Temporary))
        .await;

    let response = app.server().get("/en/test-page/").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), "/en/b/");
}

#[tokio::test]
async fn test_gone_for_unmatched_not_found() {
    let settings = RedirectSettings {
        gone_on_no_match: true,
        ..Default::default()
    };
    let app = TestApp::new(settings);
    let server = app.server();

    server.get("/nowhere/").await.assert_status(StatusCode::GONE);
    server.get("/private/").await.assert_status(StatusCode::FORBIDDEN);
    server.get("/en/").await.assert_status_ok();
}

#[tokio::test]
async fn test_gone_for_every_failed_response() {
    let settings = RedirectSettings {
        phase: RedirectPhase::Response,
        not_found_only: false,
        gone_on_no_match: true,
        gone_not_found_only: false,
        ..Default::default()
    };
    let app = TestApp::new(settings);
    let server = app.server();

    server.get("/nowhere/").await.assert_status(StatusCode::GONE);
    server.get("/private/").await.assert_status(StatusCode::GONE);
    server.get("/en/").await.assert_status_ok();
}

#[tokio::test]
async fn test_delete_takes_effect_immediately() {
    let app = TestApp::new(RedirectSettings::default());
    let rule = app.add(NewRedirect::new(SITE, "/old/", "/new/")).await;
    let server = app.server();

    server
        .get("/old/")
        .await
        .assert_status(StatusCode::MOVED_PERMANENTLY);

    app.service().delete(rule.id).await.unwrap();

    server.get("/old/").await.assert_status_not_found();
}

#[tokio::test]
async fn test_update_takes_effect_immediately() {
    let app = TestApp::new(RedirectSettings::default());
    let rule = app.add(NewRedirect::new(SITE, "/old/", "/new/")).await;
    let server = app.server();

    assert_eq!(server.get("/old/").await.header("location"), "/new/");

    let patch = RedirectPatch {
        new_path: Some("/newer/".to_string()),
        response_code: Some(ResponseCode::Temporary),
        ..Default::default()
    };
    app.service().update(rule.id, patch).await.unwrap();

    let response = server.get("/old/").await;
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.header("location"), "/newer/");
}

#[tokio::test]
async fn test_rule_added_after_miss_is_seen() {
    let app = TestApp::new(RedirectSettings::default());
    let server = app.server();

    server.get("/later/").await.assert_status_not_found();

    app.add(NewRedirect::new(SITE, "/later/", "/en/b/")).await;

    server
        .get("/later/")
        .await
        .assert_status(StatusCode::MOVED_PERMANENTLY);
}

#[tokio::test]
async fn test_missing_site_configuration_is_an_error() {
    let app = TestApp::with_sites(RedirectSettings::default(), None);

    let response = app.server().get("/en/").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);

    let body = response.json::<serde_json::Value>();
    assert_eq!(body["error"]["code"], "configuration_error");
    assert_eq!(body["error"]["message"], NO_SITE_MESSAGE);
}

#[tokio::test]
async fn test_rules_of_other_sites_are_ignored() {
    let app = TestApp::new(RedirectSettings::default());
    app.add_raw(NewRedirect::new(SITE + 1, "/old/", "/new/"))
        .await;

    app.server().get("/old/").await.assert_status_not_found();
}

#[tokio::test]
async fn test_encoded_question_mark_is_not_a_query() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/shop/?id=5", "/en/b/")).await;
    let server = app.server();

    server.get("/shop/%3Fid=5").await.assert_status_not_found();
}

#[tokio::test]
async fn test_unmatched_paths_do_not_grow_the_cache_without_bound() {
    let app = TestApp::with_cache(
        RedirectSettings::default(),
        MemoryCache::new().with_max_entries(64),
    );
    app.add(NewRedirect::new(SITE, "/old/", "/en/b/")).await;
    let server = app.server();

    for i in 0..500 {
        server
            .get(&format!("/nothing-{}/", i))
            .await
            .assert_status_not_found();
    }

    assert!(app.cache.len() <= 64);
    let response = server.get("/old/").await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);
}

#[tokio::test]
async fn test_subpath_remainder_with_percent_sign_is_escaped() {
    let app = TestApp::new(RedirectSettings::default());
    app.add(NewRedirect::new(SITE, "/help/", "/support/").subpath())
        .await;
    let server = app.server();

    let response = server.get("/help/100%25").await;

    response.assert_status(StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.header("location"), "/support/100%25");
}
