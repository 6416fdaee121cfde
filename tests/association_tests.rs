//! Integration tests for association resolution.
//!
//! These tests verify when associations are read from embedded data, when
//! they are fetched, and that each fetch happens at most once.

use std::sync::Arc;

use rest_model::clients::{Api, ApiBuilder};
use rest_model::rest::{
    AssociationDefinition, AssociationKind, Format, JsonApiParser, Linked, Schema,
};
use rest_model::{ApiConfig, BaseUrl};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connect(server: &MockServer, builder: impl FnOnce(ApiBuilder) -> ApiBuilder) -> Arc<Api> {
    let config = ApiConfig::builder()
        .base_url(BaseUrl::new(server.uri()).unwrap())
        .tries(1)
        .build()
        .unwrap();
    builder(Api::builder(config)).build().unwrap()
}

/// Users belong to organizations, have one role and have many comments.
fn bluth(server: &MockServer) -> Arc<Api> {
    connect(server, |api| {
        api.model(
            Schema::builder("User")
                .belongs_to("organization")
                .has_one("role")
                .has_many("comments")
                .build()
                .unwrap(),
        )
        .model(Schema::builder("Organization").build().unwrap())
        .model(Schema::builder("Role").build().unwrap())
        .model(Schema::builder("Comment").build().unwrap())
    })
}

async fn mount_user(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_organization(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/organizations/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Bluth Company"})),
        )
        .expect(expected)
        .mount(server)
        .await;
}

// ============================================================================
// belongs_to
// ============================================================================

#[tokio::test]
async fn test_embedded_association_needs_no_request() {
    let server = MockServer::start().await;
    mount_user(
        &server,
        json!({
            "id": 1,
            "name": "Tobias Fünke",
            "organization": {"id": 1, "name": "Bluth Company"},
            "organization_id": 1
        }),
    )
    .await;
    mount_organization(&server, 0).await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.find(1).await.unwrap().unwrap();

    let organization = user.one("organization").await.unwrap().unwrap();
    assert_eq!(organization.get("name").unwrap(), &json!("Bluth Company"));
    assert!(!user.has_attribute("organization"));
}

#[tokio::test]
async fn test_missing_association_is_fetched_once() {
    let server = MockServer::start().await;
    mount_user(&server, json!({"id": 1, "name": "Tobias Fünke", "organization_id": 1})).await;
    mount_organization(&server, 1).await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.find(1).await.unwrap().unwrap();

    for _ in 0..3 {
        let organization = user.one("organization").await.unwrap().unwrap();
        assert_eq!(organization.get("name").unwrap(), &json!("Bluth Company"));
    }
}

#[tokio::test]
async fn test_known_absent_association_is_not_fetched() {
    let server = MockServer::start().await;
    mount_user(
        &server,
        json!({"id": 1, "organization": null, "organization_id": 1, "comments": []}),
    )
    .await;
    mount_organization(&server, 0).await;
    Mock::given(method("GET"))
        .and(path("/users/1/comments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(0)
        .mount(&server)
        .await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.find(1).await.unwrap().unwrap();

    assert!(user.one("organization").await.unwrap().is_none());
    assert!(user.many("comments").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_foreign_key_resolves_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.new_resource(json!({"id": 1, "organization_id": null})).unwrap();

    assert!(user.one("organization").await.unwrap().is_none());
}

#[tokio::test]
async fn test_params_force_fetch_without_replacing_cache() {
    let server = MockServer::start().await;
    mount_user(
        &server,
        json!({"id": 1, "organization_id": 1, "organization": {"id": 1, "name": "Bluth Company"}}),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/organizations/1"))
        .and(query_param("archived", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Bluth (archived)"})),
        )
        .expect(2)
        .mount(&server)
        .await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.find(1).await.unwrap().unwrap();

    for _ in 0..2 {
        let archived = user
            .one_with("organization", json!({"archived": true}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(archived.get("name").unwrap(), &json!("Bluth (archived)"));
    }

    let cached = user.one("organization").await.unwrap().unwrap();
    assert_eq!(cached.get("name").unwrap(), &json!("Bluth Company"));
}

#[tokio::test]
async fn test_custom_association_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/companies/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 5, "name": "Sitwell"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = connect(&server, |api| {
        api.model(
            Schema::builder("User")
                .association(
                    AssociationDefinition::new(AssociationKind::BelongsTo, "employer")
                        .with_class_name("Company")
                        .with_foreign_key("company_id")
                        .with_path("/companies/:company_id"),
                )
                .build()
                .unwrap(),
        )
        .model(Schema::builder("Company").build().unwrap())
    });
    let mut user = api
        .model("User")
        .unwrap()
        .new_resource(json!({"id": 1, "company_id": 5}))
        .unwrap();

    let employer = user.one("employer").await.unwrap().unwrap();
    assert_eq!(employer.model().name(), "Company");
    assert_eq!(employer.get("name").unwrap(), &json!("Sitwell"));
}

// ============================================================================
// has_one / has_many
// ============================================================================

#[tokio::test]
async fn test_has_one_fetches_nested_path() {
    let server = MockServer::start().await;
    mount_user(&server, json!({"id": 1})).await;
    Mock::given(method("GET"))
        .and(path("/users/1/role"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3, "name": "admin"})))
        .expect(1)
        .mount(&server)
        .await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.find(1).await.unwrap().unwrap();

    let role = user.one("role").await.unwrap().unwrap();
    assert_eq!(role.get("name").unwrap(), &json!("admin"));
    assert_eq!(user.call("role?", None).unwrap(), json!(true));
}

#[tokio::test]
async fn test_has_many_fetches_and_links_back() {
    let server = MockServer::start().await;
    mount_user(&server, json!({"id": 1, "name": "Tobias"})).await;
    Mock::given(method("GET"))
        .and(path("/users/1/comments"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1, "body": "first"}, {"id": 2, "body": "second"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.find(1).await.unwrap().unwrap();

    let comments = user.many("comments").await.unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0].id(), Some(&json!(1)));

    let author = comments[1]
        .cached_association("user")
        .and_then(Linked::as_one)
        .unwrap();
    assert_eq!(author.get("name").unwrap(), &json!("Tobias"));

    assert_eq!(user.many("comments").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_has_many_not_found_is_empty_and_cached() {
    let server = MockServer::start().await;
    mount_user(&server, json!({"id": 1})).await;
    Mock::given(method("GET"))
        .and(path("/users/1/comments"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"message": "Not Found", "errors": ["missing"]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.find(1).await.unwrap().unwrap();

    let comments = user.many("comments").await.unwrap();
    assert!(comments.is_empty());
    assert!(comments.has_errors());

    assert!(user.many("comments").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_new_parent_has_nothing_to_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.new_resource(json!({"name": "Maeby"})).unwrap();

    assert!(user.many("comments").await.unwrap().is_empty());
    assert!(user.one("role").await.unwrap().is_none());
}

#[tokio::test]
async fn test_call_reads_association_value() {
    let server = MockServer::start().await;
    mount_user(
        &server,
        json!({"id": 1, "comments": [{"id": 4, "body": "Hey"}]}),
    )
    .await;

    let users = bluth(&server).model("User").unwrap();
    let mut user = users.find(1).await.unwrap().unwrap();

    assert_eq!(user.call("comments", None).unwrap(), json!([{"id": 4, "body": "Hey"}]));
    assert_eq!(user.call("comments?", None).unwrap(), json!(true));
}

// ============================================================================
// JSON:API
// ============================================================================

#[tokio::test]
async fn test_json_api_included_resources_are_embedded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "type": "users",
                "id": "1",
                "attributes": {"name": "Tobias Fünke"},
                "relationships": {
                    "organization": {"data": {"type": "organizations", "id": "1"}}
                }
            },
            "included": [
                {"type": "organizations", "id": "1", "attributes": {"name": "Bluth Company"}}
            ],
            "meta": {"request": "abc"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/organizations/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = connect(&server, |api| {
        api.parser(JsonApiParser)
            .model(
                Schema::builder("User")
                    .format(Format::JsonApi)
                    .belongs_to("organization")
                    .build()
                    .unwrap(),
            )
            .model(
                Schema::builder("Organization")
                    .format(Format::JsonApi)
                    .build()
                    .unwrap(),
            )
    });
    let mut user = api.model("User").unwrap().find(1).await.unwrap().unwrap();

    assert_eq!(user.id(), Some(&json!("1")));
    assert_eq!(user.metadata().get("request"), Some(&json!("abc")));

    let organization = user.one("organization").await.unwrap().unwrap();
    assert_eq!(organization.get("name").unwrap(), &json!("Bluth Company"));
}

#[tokio::test]
async fn test_json_api_included_attribute_named_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "type": "users",
                "id": "1",
                "attributes": {"name": "Tobias Fünke"},
                "relationships": {
                    "organization": {"data": {"type": "organizations", "id": "1"}}
                }
            },
            "included": [{
                "type": "organizations",
                "id": "1",
                "attributes": {"name": "Bluth Company", "type": "family"}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = connect(&server, |api| {
        api.parser(JsonApiParser)
            .model(
                Schema::builder("User")
                    .format(Format::JsonApi)
                    .belongs_to("organization")
                    .build()
                    .unwrap(),
            )
            .model(
                Schema::builder("Organization")
                    .format(Format::JsonApi)
                    .build()
                    .unwrap(),
            )
    });
    let mut user = api.model("User").unwrap().find(1).await.unwrap().unwrap();

    let organization = user.one("organization").await.unwrap().unwrap();
    assert_eq!(organization.id(), Some(&json!("1")));
    assert_eq!(organization.get("name").unwrap(), &json!("Bluth Company"));
    assert_eq!(organization.get("type").unwrap(), &json!("family"));
}
