//! Integration tests for the UCMDB REST client using wiremock.

use hemmer_provider_ucmdb::client::{
    ClientError, ConfigurationItem, TopologyData, TopologyQuery, UcmdbApi,
};
use hemmer_provider_ucmdb::{Credentials, RestClient};
use secrecy::SecretString;
use serde_json::{json, Map};
use wiremock::matchers::{bearer_token, body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> RestClient {
    RestClient::new(&Credentials {
        address: format!("{}/ucmdb", server.uri()),
        user: "admin".into(),
        password: SecretString::new("s3cret".into()),
    })
    .expect("mock server address is valid")
}

async fn mount_auth(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/ucmdb/rest-api/authenticate"))
        .and(body_json(json!({
            "username": "admin",
            "password": "s3cret",
            "clientContext": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": token })))
        .mount(server)
        .await;
}

fn web01() -> ConfigurationItem {
    let mut properties = Map::new();
    properties.insert("name".into(), json!("web01"));
    properties.insert("description".into(), json!("frontend"));
    ConfigurationItem {
        ucmdb_id: "node".into(),
        ci_type: "node".into(),
        properties,
    }
}

mod authentication {
    use super::*;

    /// Authenticates once and reuses the token for later calls
    #[tokio::test]
    async fn test_token_is_reused() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ucmdb/rest-api/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "tok-1"})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/ucmdb/rest-api/topologyQuery"))
            .and(bearer_token("tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cis": []})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let query = TopologyQuery::default();
        client.execute_query(&query).await.unwrap();
        client.execute_query(&query).await.unwrap();
    }

    /// A rejected login surfaces as AuthFailed
    #[tokio::test]
    async fn test_rejected_login() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ucmdb/rest-api/authenticate"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .get_configuration_item("4d1c0a")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::AuthFailed(_)));
        assert!(err.is_auth_error());
    }

    /// A login response without a token is an AuthFailed error
    #[tokio::test]
    async fn test_login_without_token() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ucmdb/rest-api/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_configuration_item("4d1c0a")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not contain a token"));
    }

    /// A 401 drops the token so the next call logs in again
    #[tokio::test]
    async fn test_unauthorized_forces_reauthentication() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/ucmdb/rest-api/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "stale"})))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/ucmdb/rest-api/authenticate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "fresh"})))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/ucmdb/rest-api/dataModel/ci/4d1c0a"))
            .and(bearer_token("stale"))
            .respond_with(ResponseTemplate::new(401).set_body_string("session expired"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ucmdb/rest-api/dataModel/ci/4d1c0a"))
            .and(bearer_token("fresh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ucmdbId": "4d1c0a",
                "type": "node",
                "properties": {"name": "web01", "description": ""}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .get_configuration_item("4d1c0a")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(ref m) if m == "session expired"));

        let ci = client.get_configuration_item("4d1c0a").await.unwrap();
        assert_eq!(ci.ucmdb_id, "4d1c0a");
        assert_eq!(ci.ci_type, "node");
    }
}

mod data_model {
    use super::*;

    /// Topology queries are posted with the node filters in camelCase
    #[tokio::test]
    async fn test_execute_query() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok").await;

        let query = hemmer_provider_ucmdb::data_sources::ucmdb_list::build_query(&[
            serde_json::from_value(json!({"type": "host", "names": ["a", "b"]})).unwrap(),
        ]);

        Mock::given(method("POST"))
            .and(path("/ucmdb/rest-api/topologyQuery"))
            .and(bearer_token("tok"))
            .and(body_json(json!({
                "nodes": [{
                    "type": "host",
                    "queryIdentifier": "host",
                    "visible": true,
                    "includeSubtypes": true,
                    "layout": ["name"],
                    "attributeConditions": [
                        {"attribute": "name", "operator": "in", "value": ["a", "b"]}
                    ]
                }],
                "relations": []
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "cis": [
                    {"ucmdbId": "1", "type": "host", "properties": {"name": "a"}},
                    {"ucmdbId": "2", "type": "host", "properties": {"name": "b"}}
                ],
                "relations": []
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).execute_query(&query).await.unwrap();
        assert_eq!(result.cis.len(), 2);
        assert_eq!(result.cis[1].string_property("name").unwrap(), Some("b"));
    }

    /// Create posts the payload to dataModel and decodes the change lists
    #[tokio::test]
    async fn test_create_data_model() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok").await;

        Mock::given(method("POST"))
            .and(path("/ucmdb/rest-api/dataModel"))
            .and(body_json(json!({
                "cis": [{
                    "ucmdbId": "node",
                    "type": "node",
                    "properties": {"name": "web01", "description": "frontend"}
                }],
                "relations": []
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "addedCis": ["CI123"],
                "removedCis": [],
                "updatedCis": [],
                "ignoredCis": []
            })))
            .mount(&server)
            .await;

        let change = client_for(&server)
            .create_data_model(&TopologyData {
                cis: vec![web01()],
                relations: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(change.added_cis, vec!["CI123".to_string()]);
        assert!(change.updated_cis.is_empty());
    }

    /// Update and delete address the CI by id
    #[tokio::test]
    async fn test_update_and_delete() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok").await;

        Mock::given(method("PUT"))
            .and(path("/ucmdb/rest-api/dataModel/ci/CI123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"updatedCis": ["CI123"]})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/ucmdb/rest-api/dataModel/ci/CI123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"removedCis": ["CI123"]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let change = client
            .update_configuration_item("CI123", &web01())
            .await
            .unwrap();
        assert_eq!(change.updated_cis, vec!["CI123".to_string()]);

        let change = client.delete_configuration_item("CI123").await.unwrap();
        assert_eq!(change.removed_cis, vec!["CI123".to_string()]);
    }

    /// Ids are sent as a single escaped path segment
    #[tokio::test]
    async fn test_ci_id_stays_in_its_segment() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok").await;

        Mock::given(method("DELETE"))
            .and(path("/ucmdb/rest-api/dataModel/ci/a%2Fb"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"removedCis": ["a/b"]})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/ucmdb/rest-api/dataModel/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let change = client.delete_configuration_item("a/b").await.unwrap();
        assert_eq!(change.removed_cis, vec!["a/b".to_string()]);

        let err = client.delete_configuration_item("..").await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidId(ref id) if id == ".."));
    }
}

mod errors {
    use super::*;

    /// A 404 maps to NotFound with the request URL
    #[tokio::test]
    async fn test_not_found() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok").await;

        Mock::given(method("GET"))
            .and(path("/ucmdb/rest-api/dataModel/ci/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_configuration_item("missing")
            .await
            .unwrap_err();
        match err {
            ClientError::NotFound(url) => {
                assert!(url.ends_with("/ucmdb/rest-api/dataModel/ci/missing"))
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    /// Other failures carry the status and a truncated body
    #[tokio::test]
    async fn test_server_error_truncates_body() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok").await;

        Mock::given(method("POST"))
            .and(path("/ucmdb/rest-api/dataModel"))
            .respond_with(ResponseTemplate::new(500).set_body_string("x".repeat(1000)))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_data_model(&TopologyData::default())
            .await
            .unwrap_err();
        match err {
            ClientError::Api { status, message, .. } => {
                assert_eq!(status, 500);
                assert!(message.starts_with(&"x".repeat(200)));
                assert!(message.contains("[truncated, 1000 bytes total]"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    /// A success status with an undecodable body is InvalidResponse
    #[tokio::test]
    async fn test_invalid_response_body() {
        let server = MockServer::start().await;
        mount_auth(&server, "tok").await;

        Mock::given(method("GET"))
            .and(path("/ucmdb/rest-api/dataModel/ci/4d1c0a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_configuration_item("4d1c0a")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidResponse(_)));
    }
}
