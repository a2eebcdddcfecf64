mod common;

use axum_test::TestServer;
use club_core::resolver::FallbackPolicy;
use common::setup_test_app;
use http::StatusCode;
use serde_json::{Value, json};

/// Resolve `slug` once and return the id of its bootstrap admin.
async fn admin_of(server: &TestServer, slug: &str) -> String {
    let users: Value = server
        .get("/api/users")
        .add_query_param("shop", slug)
        .await
        .json();
    let users = users.as_array().expect("users array");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["role"], "ADMIN");
    users[0]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn new_shop_lists_default_categories() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);

    let res = server
        .get("/api/categories")
        .add_query_param("shop", "fresh-shop")
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body: Value = res.json();
    let categories = body.as_array().unwrap();
    let names: Vec<_> = categories.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["General", "Products", "Support"]);
    assert_eq!(categories[0]["color"], "bg-blue-500");
    assert_eq!(categories[0]["order"], 1);
}

#[tokio::test]
async fn admin_creates_category_and_duplicates_conflict() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let admin_id = admin_of(&server, "cat-shop").await;

    let created = server
        .post("/api/categories")
        .add_query_param("shop", "cat-shop")
        .json(&json!({
            "userId": admin_id,
            "name": "Events",
            "color": "bg-purple-500",
            "order": 4
        }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    assert_eq!(created.json::<Value>()["name"], "Events");

    let duplicate = server
        .post("/api/categories")
        .add_query_param("shop", "cat-shop")
        .json(&json!({ "user_id": admin_id, "name": "General", "color": "bg-red-500" }))
        .await;
    assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);

    let listed: Value = server
        .get("/api/categories")
        .add_query_param("shop", "cat-shop")
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn category_requires_name_and_color() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let admin_id = admin_of(&server, "strict-shop").await;

    let res = server
        .post("/api/categories")
        .add_query_param("shop", "strict-shop")
        .json(&json!({ "user_id": admin_id, "name": "No colour" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_of_another_shop_cannot_create_category() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let foreign_admin = admin_of(&server, "shop-a").await;
    admin_of(&server, "shop-b").await;

    let res = server
        .post("/api/categories")
        .add_query_param("shop", "shop-b")
        .json(&json!({ "user_id": foreign_admin, "name": "Hijack", "color": "bg-red-500" }))
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_update_is_admin_only() {
    let (server, store) = setup_test_app(FallbackPolicy::Reject);
    let admin_id = admin_of(&server, "role-shop").await;

    let demoted = server
        .put(&format!("/api/users/{admin_id}/role"))
        .add_query_param("shop", "role-shop")
        .json(&json!({ "adminUserId": admin_id, "role": "SUPERUSER" }))
        .await;
    assert_eq!(demoted.status_code(), StatusCode::BAD_REQUEST);

    let updated = server
        .put(&format!("/api/users/{admin_id}/role"))
        .add_query_param("shop", "role-shop")
        .json(&json!({ "admin_user_id": admin_id, "role": "MODERATOR" }))
        .await;
    assert_eq!(updated.status_code(), StatusCode::OK);
    let body: Value = updated.json();
    assert_eq!(body["message"], "User role updated to MODERATOR");
    assert_eq!(body["user"]["role"], "MODERATOR");

    // No longer an admin.
    let again = server
        .put(&format!("/api/users/{admin_id}/role"))
        .add_query_param("shop", "role-shop")
        .json(&json!({ "admin_user_id": admin_id, "role": "ADMIN" }))
        .await;
    assert_eq!(again.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(store.shop_count(), 1);
}

#[tokio::test]
async fn posts_are_scoped_and_newest_first() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let author = admin_of(&server, "post-shop").await;

    for title in ["First", "Second"] {
        let res = server
            .post("/api/posts")
            .add_query_param("shop", "post-shop")
            .json(&json!({
                "authorId": author,
                "title": title,
                "content": "Hello club",
                "category": "Products"
            }))
            .await;
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert!(res.json::<Value>()["category_id"].is_string());
    }

    let posts: Value = server
        .get("/api/posts")
        .add_query_param("shop", "post-shop")
        .await
        .json();
    let titles: Vec<_> = posts
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Second", "First"]);

    let elsewhere: Value = server
        .get("/api/posts")
        .add_query_param("shop", "other-shop")
        .await
        .json();
    assert!(elsewhere.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn post_validation_and_author_scope() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let foreign_author = admin_of(&server, "home-shop").await;

    let missing = server
        .post("/api/posts")
        .add_query_param("shop", "away-shop")
        .json(&json!({ "title": "No body", "author_id": foreign_author }))
        .await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);

    let foreign = server
        .post("/api/posts")
        .add_query_param("shop", "away-shop")
        .json(&json!({ "title": "Hi", "content": "x", "author_id": foreign_author }))
        .await;
    assert_eq!(foreign.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_category_leaves_post_uncategorized() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let author = admin_of(&server, "loose-shop").await;

    let res = server
        .post("/api/posts")
        .add_query_param("shop", "loose-shop")
        .json(&json!({
            "author_id": author,
            "title": "Misc",
            "content": "Anything",
            "category": "Nonexistent"
        }))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    assert!(res.json::<Value>()["category_id"].is_null());
}

/// Create a post in `slug` by its admin and return `(admin id, post id)`.
async fn post_in(server: &TestServer, slug: &str) -> (String, String) {
    let author = admin_of(server, slug).await;
    let post: Value = server
        .post("/api/posts")
        .add_query_param("shop", slug)
        .json(&json!({ "author_id": author, "title": "Topic", "content": "Discuss" }))
        .await
        .json();
    (author, post["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn comments_are_listed_oldest_first() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let (author, post_id) = post_in(&server, "talk-shop").await;

    for content in ["First!", "Second"] {
        let res = server
            .post(&format!("/api/posts/{post_id}/comments"))
            .add_query_param("shop", "talk-shop")
            .json(&json!({ "authorId": author, "content": content }))
            .await;
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.json::<Value>()["post_id"], post_id.as_str());
    }

    let comments: Value = server
        .get(&format!("/api/posts/{post_id}/comments"))
        .add_query_param("shop", "talk-shop")
        .await
        .json();
    let contents: Vec<_> = comments
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["First!", "Second"]);
}

#[tokio::test]
async fn comment_requires_content_and_author() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let (author, post_id) = post_in(&server, "quiet-shop").await;

    let res = server
        .post(&format!("/api/posts/{post_id}/comments"))
        .add_query_param("shop", "quiet-shop")
        .json(&json!({ "author_id": author }))
        .await;
    assert_eq!(res.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn comments_on_another_shops_post_are_not_found() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let (_author, post_id) = post_in(&server, "owner-shop").await;
    let outsider = admin_of(&server, "outsider-shop").await;

    let listed = server
        .get(&format!("/api/posts/{post_id}/comments"))
        .add_query_param("shop", "outsider-shop")
        .await;
    assert_eq!(listed.status_code(), StatusCode::NOT_FOUND);

    let created = server
        .post(&format!("/api/posts/{post_id}/comments"))
        .add_query_param("shop", "outsider-shop")
        .json(&json!({ "author_id": outsider, "content": "Sneaky" }))
        .await;
    assert_eq!(created.status_code(), StatusCode::NOT_FOUND);

    // Own post, foreign author.
    let foreign_author = server
        .post(&format!("/api/posts/{post_id}/comments"))
        .add_query_param("shop", "owner-shop")
        .json(&json!({ "author_id": outsider, "content": "Sneaky" }))
        .await;
    assert_eq!(foreign_author.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reactions_toggle_and_group_by_type() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let (user, post_id) = post_in(&server, "react-shop").await;
    let react = |kind: &'static str| {
        server
            .post(&format!("/api/posts/{post_id}/reactions"))
            .add_query_param("shop", "react-shop")
            .json(&json!({ "type": kind, "userId": user }))
    };

    let created: Value = react("LIKE").await.json();
    assert_eq!(created["action"], "created");
    assert_eq!(created["reaction"]["type"], "LIKE");

    let grouped: Value = server
        .get(&format!("/api/posts/{post_id}/reactions"))
        .add_query_param("shop", "react-shop")
        .await
        .json();
    assert_eq!(grouped["LIKE"][0]["id"], user.as_str());

    let updated: Value = react("LOVE").await.json();
    assert_eq!(updated["action"], "updated");
    assert_eq!(updated["reaction"]["type"], "LOVE");

    let removed: Value = react("LOVE").await.json();
    assert_eq!(removed, json!({ "action": "removed", "type": "LOVE" }));

    let empty: Value = server
        .get(&format!("/api/posts/{post_id}/reactions"))
        .add_query_param("shop", "react-shop")
        .await
        .json();
    assert_eq!(empty, json!({}));
}

#[tokio::test]
async fn reactions_are_scoped_to_the_shop() {
    let (server, _store) = setup_test_app(FallbackPolicy::Reject);
    let (_user, post_id) = post_in(&server, "liked-shop").await;
    let outsider = admin_of(&server, "lurker-shop").await;

    let res = server
        .post(&format!("/api/posts/{post_id}/reactions"))
        .add_query_param("shop", "lurker-shop")
        .json(&json!({ "type": "LIKE", "user_id": outsider }))
        .await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    let missing_type = server
        .post(&format!("/api/posts/{post_id}/reactions"))
        .add_query_param("shop", "liked-shop")
        .json(&json!({ "user_id": outsider }))
        .await;
    assert_eq!(missing_type.status_code(), StatusCode::BAD_REQUEST);
}
