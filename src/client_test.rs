use super::*;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;

/// Serve `app` on an ephemeral loopback port, returning the base URL.
async fn serve(app: Router) -> String {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

/// `/sql` endpoint that answers every request with the envelope it got.
async fn sql_echo() -> String {
    serve(Router::new().route("/sql", post(echo))).await
}

#[tokio::test]
async fn table_list_sends_complete_info_envelope() {
    let base = sql_echo().await;
    let db = MintDb::new(base);

    let sent = db.table_list().await.expect("table_list");
    assert_eq!(
        sent,
        json!({
            "stmt": "INFO",
            "tb": "",
            "doc": "",
            "data": {},
            "topic": "",
            "user_id": 1,
            "message": "",
        })
    );
}

#[tokio::test]
async fn create_table_envelopes_are_identical_across_calls() {
    let base = sql_echo().await;
    let db = MintDb::new(base);

    let first = db.create_table("car").await.expect("first call");
    let second = db.create_table("car").await.expect("second call");

    assert_eq!(first["stmt"], "ADD");
    assert_eq!(first["tb"], "car");
    assert_eq!(first["doc"], "");
    assert_eq!(first, second);
}

#[tokio::test]
async fn configured_user_id_is_stamped_into_envelopes() {
    let base = sql_echo().await;
    let db = MintDb::new(base).user_id(7);

    let sent = db.table_list().await.expect("table_list");
    assert_eq!(sent["user_id"], 7);
}

#[tokio::test]
async fn document_writes_address_table_and_doc() {
    let base = sql_echo().await;
    let db = MintDb::new(base);

    let created = db
        .create_doc(
            "car",
            "car:1",
            json!({ "make": "Mercedes-Benz", "model": "G-Wagon" }),
        )
        .await
        .expect("create_doc");
    assert_eq!(created["stmt"], "CREATE");
    assert_eq!(created["tb"], "car");
    assert_eq!(created["doc"], "car:1");
    assert_eq!(
        created["data"],
        json!({ "make": "Mercedes-Benz", "model": "G-Wagon" })
    );

    let merged = db
        .merge("car", "car:1", json!({ "model": "G-Wagon AMG" }))
        .await
        .expect("merge");
    assert_eq!(merged["stmt"], "MERGE");
    assert_eq!(merged["data"], json!({ "model": "G-Wagon AMG" }));
}

#[tokio::test]
async fn key_writes_wrap_key_value_payload() {
    let base = sql_echo().await;
    let db = MintDb::new(base);

    let pushed = db
        .push("car", "car:1", "owners", json!("lucy"))
        .await
        .expect("push");
    assert_eq!(pushed["stmt"], "PUSH");
    assert_eq!(pushed["data"], json!({ "key": "owners", "value": "lucy" }));

    let put = db
        .put("car", "car:1", "miles", json!(12000))
        .await
        .expect("put");
    assert_eq!(put["stmt"], "PUT");
    assert_eq!(put["data"], json!({ "key": "miles", "value": 12000 }));
}

#[tokio::test]
async fn selects_address_one_document_or_all() {
    let base = sql_echo().await;
    let db = MintDb::new(base);

    let one = db.get_one("car", "car:1").await.expect("get_one");
    assert_eq!(one["stmt"], "SELECT");
    assert_eq!(one["doc"], "car:1");
    assert_eq!(one["data"], json!({}));

    let all = db.get_all("car").await.expect("get_all");
    assert_eq!(all["stmt"], "SELECT");
    assert_eq!(all["doc"], "*");
}

#[tokio::test]
async fn find_and_match_differ_only_in_statement() {
    let base = sql_echo().await;
    let db = MintDb::new(base);
    let filter = json!({ "make": "Mercedes-Benz", "model": "G-Wagon" });

    let found = db.find("car", filter.clone()).await.expect("find");
    let matched = db.match_docs("car", filter.clone()).await.expect("match");

    assert_eq!(found["stmt"], "FIND");
    assert_eq!(matched["stmt"], "MATCH");
    assert_eq!(found["data"], filter);
    assert_eq!(found["data"], matched["data"]);
    assert_eq!(found["tb"], matched["tb"]);
    assert_eq!(found["doc"], "");
}

#[tokio::test]
async fn compare_forwards_operator_string_unvalidated() {
    let base = sql_echo().await;
    let db = MintDb::new(base);

    let sent = db
        .compare("car", "model", "icontains", json!("amg"))
        .await
        .expect("compare");
    assert_eq!(sent["stmt"], "COMPARE");
    assert_eq!(
        sent["data"],
        json!({ "lhs": "model", "op": "icontains", "rhs": "amg" })
    );

    // Nonsense operators go through too; legality is server-enforced.
    let nonsense = db
        .compare("car", "model", "definitely-not-an-op", json!(1))
        .await
        .expect("compare");
    assert_eq!(nonsense["data"]["op"], "definitely-not-an-op");
}

#[tokio::test]
async fn delete_variants_address_key_doc_or_table() {
    let base = sql_echo().await;
    let db = MintDb::new(base);

    let key = db.delete_key("car", "car:1", "miles").await.expect("key");
    assert_eq!(key["stmt"], "DELETE");
    assert_eq!(key["doc"], "car:1");
    assert_eq!(key["data"], json!({ "key": "miles" }));

    let doc = db.delete_doc("car", "car:1").await.expect("doc");
    assert_eq!(doc["stmt"], "DELETE");
    assert_eq!(doc["doc"], "car:1");
    assert_eq!(doc["data"], json!({}));

    let table_wide = db.delete_key_all("car", "miles").await.expect("table");
    assert_eq!(table_wide["stmt"], "DELETE");
    assert_eq!(table_wide["doc"], "*");
    assert_eq!(table_wide["data"], json!({ "key": "miles" }));
}

#[tokio::test]
async fn graph_operations_carry_edge_and_traversal_payloads() {
    let base = sql_echo().await;
    let db = MintDb::new(base);

    let edge = db
        .relate("person", "person:1", "car", "car:1", "owns")
        .await
        .expect("relate");
    assert_eq!(edge["stmt"], "REL");
    assert_eq!(edge["doc"], "person:1");
    assert_eq!(
        edge["data"],
        json!({ "rel_tb": "car", "rel_doc": "car:1", "rel": "owns" })
    );

    let bfs = db
        .bfs("person", "person:1", "person:9", "knows")
        .await
        .expect("bfs");
    assert_eq!(bfs["stmt"], "BFS");
    assert_eq!(
        bfs["data"],
        json!({ "target_doc": "person:9", "rel": "knows" })
    );

    let dfs = db
        .dfs("person", "person:1", "person:9", "knows")
        .await
        .expect("dfs");
    assert_eq!(dfs["stmt"], "DFS");
    assert_eq!(dfs["data"], bfs["data"]);
}

#[tokio::test]
async fn sql_sends_caller_envelope_verbatim() {
    let base = sql_echo().await;
    let db = MintDb::new(base);

    let envelope = RequestEnvelope::new(Stmt::Select)
        .with_table("car")
        .with_doc("car:3")
        .with_user_id(99);
    let sent = db.sql(envelope.clone()).await.expect("sql");

    let verbatim = serde_json::to_value(&envelope).expect("serialize");
    assert_eq!(sent, verbatim);
    // Passthrough bypasses stamping: the client default of 1 did not apply.
    assert_eq!(sent["user_id"], 99);
}

async fn report_headers(headers: axum::http::HeaderMap) -> Json<Value> {
    let pick = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned)
    };
    Json(json!({
        "authorization": pick("authorization"),
        "accept": pick("accept"),
        "content_type": pick("content-type"),
    }))
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let base = serve(Router::new().route("/sql", post(report_headers))).await;
    let db = MintDb::new(base).bearer_token("jwt-abc");

    let seen = db.table_list().await.expect("table_list");
    assert_eq!(seen["authorization"], "Bearer jwt-abc");
    assert_eq!(seen["accept"], "application/json");
    assert_eq!(seen["content_type"], "application/json");
}

#[tokio::test]
async fn authorization_header_is_omitted_without_token() {
    let base = serve(Router::new().route("/sql", post(report_headers))).await;
    let db = MintDb::new(base);

    let seen = db.table_list().await.expect("table_list");
    assert_eq!(seen["authorization"], Value::Null);
    assert_eq!(seen["accept"], "application/json");
}

#[tokio::test]
async fn set_bearer_token_installs_and_clears_the_credential() {
    let base = serve(Router::new().route("/sql", post(report_headers))).await;
    let mut db = MintDb::new(base);

    db.set_bearer_token(Some("jwt-late".to_owned()));
    let seen = db.table_list().await.expect("with token");
    assert_eq!(seen["authorization"], "Bearer jwt-late");

    db.set_bearer_token(None);
    let seen = db.table_list().await.expect("without token");
    assert_eq!(seen["authorization"], Value::Null);
}

async fn reject_table() -> (axum::http::StatusCode, &'static str) {
    (axum::http::StatusCode::BAD_REQUEST, "no such table: car")
}

#[tokio::test]
async fn non_2xx_status_surfaces_with_body_preserved() {
    let base = serve(Router::new().route("/sql", post(reject_table))).await;
    let db = MintDb::new(base);

    let err = db.table_list().await.expect_err("status error");
    match err {
        Error::Status { status, body } => {
            assert_eq!(status.as_u16(), 400);
            assert_eq!(body, "no such table: car");
        }
        other => panic!("expected Error::Status, got {other:?}"),
    }
}

async fn not_json() -> &'static str {
    "definitely not json"
}

#[tokio::test]
async fn malformed_json_response_is_an_error_not_a_silent_default() {
    let base = serve(Router::new().route("/sql", post(not_json))).await;
    let db = MintDb::new(base);

    let err = db.table_list().await.expect_err("decode error");
    assert!(matches!(err, Error::Http(_)));
}

#[tokio::test]
async fn unreachable_server_propagates_transport_error() {
    // Reserve a port, then close it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let db = MintDb::new(format!("http://{addr}"));
    let err = db.table_list().await.expect_err("connect error");
    assert!(matches!(err, Error::Http(_)));
}

async fn auth_stub(Json(body): Json<Value>) -> Json<Value> {
    match body.get("event").and_then(Value::as_str) {
        Some("signout") => Json(json!("signed out")),
        _ => Json(json!({ "code": 200, "status": "OK", "token": "jwt-abc" })),
    }
}

#[tokio::test]
async fn signup_and_signin_decode_the_token() {
    let base = serve(Router::new().route("/auth", post(auth_stub))).await;
    let db = MintDb::new(base);

    let signed_up = db.signup("lucy@gmail.com", "abc123").await.expect("signup");
    assert!(!signed_up.token.is_empty());
    assert_eq!(signed_up.code, 200);

    let signed_in = db.signin("lucy@gmail.com", "abc123").await.expect("signin");
    assert_eq!(signed_in, signed_up);
}

#[tokio::test]
async fn signout_returns_the_confirmation_string() {
    let base = serve(Router::new().route("/auth", post(auth_stub))).await;
    let db = MintDb::new(base);

    let confirmation = db.signout("jwt-abc").await.expect("signout");
    assert_eq!(confirmation, "signed out");
}

/// Reflects the request body back through the `status` field of a Token,
/// so token-typed calls can assert the exact bytes they sent.
async fn auth_reflect_token(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "code": 200, "status": body.to_string(), "token": "reflect" }))
}

/// Reflects the request body back as the plain confirmation string.
async fn auth_reflect_string(Json(body): Json<Value>) -> Json<Value> {
    Json(json!(body.to_string()))
}

#[tokio::test]
async fn signin_request_carries_event_username_password() {
    let base = serve(Router::new().route("/auth", post(auth_reflect_token))).await;
    let db = MintDb::new(base);

    let token = db.signin("lucy@gmail.com", "abc123").await.expect("signin");
    let body: Value = serde_json::from_str(&token.status).expect("reflected body");
    assert_eq!(
        body,
        json!({ "event": "signin", "username": "lucy@gmail.com", "password": "abc123" })
    );
}

#[tokio::test]
async fn signout_request_carries_the_token_and_empty_password() {
    let base = serve(Router::new().route("/auth", post(auth_reflect_string))).await;
    let db = MintDb::new(base);

    let reflected = db.signout("jwt-abc").await.expect("signout");
    let body: Value = serde_json::from_str(&reflected).expect("reflected body");
    assert_eq!(
        body,
        json!({ "event": "signout", "username": "jwt-abc", "password": "" })
    );
}

#[tokio::test]
async fn publish_posts_topic_user_and_message() {
    let base = serve(Router::new().route("/publish", post(echo))).await;
    let db = MintDb::new(base).user_id(5);

    let sent = db.publish("inventory", "restocked").await.expect("publish");
    assert_eq!(
        sent,
        json!({ "topic": "inventory", "user_id": 5, "msg": "restocked" })
    );
}

async fn register_stub(Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(body, json!({ "user_id": 3 }));
    Json(json!({ "url": "ws://127.0.0.1:9/feed" }))
}

#[tokio::test]
async fn register_web_socket_posts_user_id_and_decodes_the_url() {
    let base = serve(Router::new().route("/register", post(register_stub))).await;
    let db = MintDb::new(base).user_id(3);

    let endpoint = db.register_web_socket().await.expect("register");
    assert_eq!(endpoint.url, "ws://127.0.0.1:9/feed");
}

#[tokio::test]
async fn trailing_slash_on_base_url_is_tolerated() {
    let base = sql_echo().await;
    let db = MintDb::new(format!("{base}/"));

    let sent = db.table_list().await.expect("table_list");
    assert_eq!(sent["stmt"], "INFO");
}
