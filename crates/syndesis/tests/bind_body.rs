//! Integration tests for body binding: JSON, XML, URL-encoded forms and
//! multipart forms with uploaded files.

use bytes::Bytes;
use http::Method;
use proptest::prelude::*;
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use syndesis::{
    Bind, BindContext, BindErrorKind, BinderConfig, DefaultBinder, FileHeader, FileMap,
    MultipartForm, QueryBinding, SourceMap,
};

#[derive(Debug, Default, PartialEq, Serialize, Deserialize, Bind)]
#[serde(default)]
struct User {
    #[bind(query = "id", path = "id", form = "id")]
    id: i64,
    #[bind(query = "name", path = "name", form = "name")]
    name: String,
}

fn request(method: Method, content_type: &str, body: &'static str) -> BindContext {
    BindContext::builder()
        .method(method)
        .uri("/".parse().unwrap())
        .header("content-type", content_type)
        .body(body)
        .build()
}

#[test]
fn test_bind_body_table() {
    struct Case {
        name: &'static str,
        content_type: &'static str,
        body: &'static str,
        expect: Result<User, BindErrorKind>,
    }

    let jon = || User {
        id: 1,
        name: "Jon Snow".to_string(),
    };

    let cases = [
        Case {
            name: "json",
            content_type: "application/json",
            body: r#"{"id":1,"name":"Jon Snow"}"#,
            expect: Ok(jon()),
        },
        Case {
            name: "json with charset",
            content_type: "application/json; charset=utf-8",
            body: r#"{"id":1,"name":"Jon Snow"}"#,
            expect: Ok(jon()),
        },
        Case {
            name: "xml",
            content_type: "application/xml",
            body: "<user><id>1</id><name>Jon Snow</name></user>",
            expect: Ok(jon()),
        },
        Case {
            name: "text/xml alias",
            content_type: "text/xml; charset=utf-8",
            body: "<user><id>1</id><name>Jon Snow</name></user>",
            expect: Ok(jon()),
        },
        Case {
            name: "form",
            content_type: "application/x-www-form-urlencoded",
            body: "id=1&name=Jon+Snow",
            expect: Ok(jon()),
        },
        Case {
            name: "unsupported content type",
            content_type: "text/plain",
            body: "id=1",
            expect: Err(BindErrorKind::UnsupportedMediaType),
        },
        Case {
            name: "empty body",
            content_type: "text/plain",
            body: "",
            expect: Ok(User::default()),
        },
        Case {
            name: "malformed json",
            content_type: "application/json",
            body: r#"{"id":1,"#,
            expect: Err(BindErrorKind::MalformedBody),
        },
        Case {
            name: "json type mismatch",
            content_type: "application/json",
            body: r#"{"id":"text"}"#,
            expect: Err(BindErrorKind::TypeMismatch),
        },
        Case {
            name: "json array into struct",
            content_type: "application/json",
            body: "[1,2]",
            expect: Err(BindErrorKind::TypeMismatch),
        },
        Case {
            name: "malformed xml",
            content_type: "application/xml",
            body: "<user><id>1</name></user>",
            expect: Err(BindErrorKind::MalformedBody),
        },
        Case {
            name: "xml type mismatch",
            content_type: "application/xml",
            body: "<user><id>text</id></user>",
            expect: Err(BindErrorKind::TypeMismatch),
        },
    ];

    for case in cases {
        let mut user = User::default();
        let result = DefaultBinder::new()
            .bind_body(&mut user, &request(Method::POST, case.content_type, case.body))
            .map(|()| user)
            .map_err(|err| err.kind());
        assert_eq!(result, case.expect, "{}", case.name);
    }
}

#[test]
fn test_json_type_error_names_field() {
    let mut user = User::default();
    let err = DefaultBinder::new()
        .bind_body(
            &mut user,
            &request(Method::POST, "application/json", r#"{"id":"text"}"#),
        )
        .unwrap_err();

    assert_eq!(err.kind(), BindErrorKind::TypeMismatch);
    assert_eq!(err.field(), Some("id"));
    assert_eq!(err.position().map(|(line, _)| line), Some(1));
    assert!(err.to_string().contains("line 1 column"));
    assert!(err.source().is_some());
    assert_eq!(user, User::default());
}

#[test]
fn test_malformed_json_keeps_cause() {
    let mut user = User::default();
    let err = DefaultBinder::new()
        .bind_body(&mut user, &request(Method::POST, "application/json", "{"))
        .unwrap_err();

    assert_eq!(err.kind(), BindErrorKind::MalformedBody);
    assert!(err
        .source()
        .is_some_and(|cause| cause.is::<serde_json::Error>()));
}

#[derive(Debug, Default, Serialize, Deserialize, Bind)]
#[serde(default)]
struct Profile {
    #[bind(path = "id")]
    id: i64,
    name: String,
    address: Address,
}

#[derive(Debug, Default, Serialize, Deserialize, Bind)]
#[serde(default)]
struct Address {
    city: String,
    zip: String,
}

#[test]
fn test_json_overlays_bound_fields() {
    let ctx = BindContext::builder()
        .method(Method::PATCH)
        .uri("/profiles/7".parse().unwrap())
        .path_param("id", "7")
        .header("content-type", "application/json")
        .body(r#"{"address":{"city":"Oslo"}}"#)
        .build();

    let mut profile = Profile {
        name: "kept".to_string(),
        address: Address {
            city: "Bergen".to_string(),
            zip: "5003".to_string(),
        },
        ..Profile::default()
    };
    DefaultBinder::new().bind(&mut profile, &ctx).unwrap();

    assert_eq!(profile.id, 7);
    assert_eq!(profile.name, "kept");
    assert_eq!(profile.address.city, "Oslo");
    assert_eq!(profile.address.zip, "5003");
}

#[test]
fn test_bind_body_into_sequence() {
    let ctx = BindContext::builder()
        .method(Method::POST)
        .uri("/?id=9&name=query".parse().unwrap())
        .path_param("id", "8")
        .header("content-type", "application/json")
        .body(r#"[{"id":1,"name":"a"},{"id":2}]"#)
        .build();

    let mut users: Vec<User> = Vec::new();
    DefaultBinder::with_config(BinderConfig::default().query_binding(QueryBinding::Always))
        .bind(&mut users, &ctx)
        .unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].name, "a");
    assert_eq!(users[1].id, 2);
    assert_eq!(users[1].name, "");
}

#[test]
fn test_form_body_folds_query_values() {
    let ctx = BindContext::builder()
        .method(Method::POST)
        .uri("/?id=2&name=query".parse().unwrap())
        .header("content-type", "application/x-www-form-urlencoded")
        .body("id=1")
        .build();

    let mut user = User::default();
    DefaultBinder::new().bind_body(&mut user, &ctx).unwrap();

    assert_eq!(user.id, 1);
    assert_eq!(user.name, "query");
}

#[test]
fn test_form_ignores_body_for_get() {
    let ctx = BindContext::builder()
        .method(Method::GET)
        .uri("/?name=query".parse().unwrap())
        .header("content-type", "application/x-www-form-urlencoded")
        .body("id=1")
        .build();

    let mut user = User::default();
    DefaultBinder::new().bind_body(&mut user, &ctx).unwrap();

    assert_eq!(user.id, 0);
    assert_eq!(user.name, "query");
}

#[derive(Debug, Default, Serialize, Deserialize, Bind)]
#[serde(default)]
struct Untagged {
    id: i64,
    name: String,
}

#[test]
fn test_form_does_not_match_untagged_fields() {
    let mut dest = Untagged::default();
    DefaultBinder::new()
        .bind_body(
            &mut dest,
            &request(
                Method::POST,
                "application/x-www-form-urlencoded",
                "id=1&name=Jon",
            ),
        )
        .unwrap();

    assert_eq!(dest.id, 0);
    assert_eq!(dest.name, "");
}

#[derive(Debug, Default, Serialize, Deserialize, Bind)]
#[serde(default)]
struct Upload {
    #[bind(form = "title")]
    title: String,
    #[bind(form = "avatar")]
    #[serde(skip)]
    avatar: Option<FileHeader>,
    #[bind(form = "docs")]
    #[serde(skip)]
    docs: Vec<FileHeader>,
}

#[derive(Debug, Default, Serialize, Deserialize, Bind)]
#[serde(default)]
struct ByValue {
    #[bind(form = "avatar")]
    #[serde(skip)]
    avatar: FileHeader,
}

fn file(name: &str, filename: &str, data: &'static str) -> FileHeader {
    FileHeader::new(name, Some(filename), Some("text/plain"), Bytes::from(data))
}

fn multipart_ctx(form: MultipartForm) -> BindContext {
    BindContext::builder()
        .method(Method::POST)
        .header("content-type", "multipart/form-data; boundary=B")
        .multipart(form)
        .build()
}

#[test]
fn test_multipart_files_and_values() {
    let values: SourceMap = [("title", "holiday")].into_iter().collect();
    let mut files = FileMap::new();
    files.push(file("avatar", "me.png", "png"));
    files.push(file("docs", "a.txt", "first"));
    files.push(file("docs", "b.txt", "second"));

    let mut upload = Upload::default();
    DefaultBinder::new()
        .bind(&mut upload, &multipart_ctx(MultipartForm::new(values, files)))
        .unwrap();

    assert_eq!(upload.title, "holiday");
    let avatar = upload.avatar.unwrap();
    assert_eq!(avatar.filename(), Some("me.png"));
    assert_eq!(avatar.size(), 3);
    let names: Vec<_> = upload.docs.iter().filter_map(FileHeader::filename).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[test]
fn test_multipart_file_by_value_is_rejected() {
    let mut files = FileMap::new();
    files.push(file("avatar", "me.png", "png"));

    let mut dest = ByValue::default();
    let err = DefaultBinder::new()
        .bind_body(
            &mut dest,
            &multipart_ctx(MultipartForm::new(SourceMap::new(), files)),
        )
        .unwrap_err();

    assert_eq!(err.kind(), BindErrorKind::Configuration);
    assert!(err.to_string().contains("Option<FileHeader>"));
}

#[tokio::test]
async fn test_multipart_parsed_from_body() {
    let body = concat!(
        "--B\r\n",
        "Content-Disposition: form-data; name=\"title\"\r\n\r\n",
        "holiday\r\n",
        "--B\r\n",
        "Content-Disposition: form-data; name=\"docs\"; filename=\"a.txt\"\r\n",
        "Content-Type: text/plain\r\n\r\n",
        "hello\r\n",
        "--B--\r\n",
    );
    let mut ctx = BindContext::builder()
        .method(Method::POST)
        .uri("/?title=query".parse().unwrap())
        .header("content-type", "multipart/form-data; boundary=B")
        .body(body)
        .build();
    let binder = DefaultBinder::new();
    ctx.parse_multipart(&binder.config().multipart).await.unwrap();

    let mut upload = Upload::default();
    binder.bind_body(&mut upload, &ctx).unwrap();

    assert_eq!(upload.title, "query");
    assert_eq!(upload.docs.len(), 1);
    assert_eq!(upload.docs[0].bytes().as_ref(), b"hello");
    assert!(upload.avatar.is_none());
}

#[derive(Debug, Default, Serialize, Deserialize, Bind)]
#[serde(default)]
struct Opts {
    #[bind(path = "node")]
    node: String,
    #[bind(query = "id")]
    id: i64,
}

#[test]
fn test_xml_body_keeps_path_values() {
    let ctx = BindContext::builder()
        .method(Method::POST)
        .uri("/nodes/real_node".parse().unwrap())
        .path_param("node", "real_node")
        .header("content-type", "application/xml")
        .body("<opts><id>1</id></opts>")
        .build();

    let mut opts = Opts::default();
    DefaultBinder::new().bind(&mut opts, &ctx).unwrap();

    assert_eq!(opts.id, 1);
    assert_eq!(opts.node, "real_node");
}

#[test]
fn test_xml_overlays_nested_elements() {
    let ctx = request(
        Method::PATCH,
        "application/xml",
        "<profile><address><city>Oslo</city></address></profile>",
    );

    let mut profile = Profile {
        name: "kept".to_string(),
        address: Address {
            city: "Bergen".to_string(),
            zip: "5003".to_string(),
        },
        ..Profile::default()
    };
    DefaultBinder::new().bind_body(&mut profile, &ctx).unwrap();

    assert_eq!(profile.name, "kept");
    assert_eq!(profile.address.city, "Oslo");
    assert_eq!(profile.address.zip, "5003");
}

#[test]
fn test_body_without_field_keeps_bound_value() {
    for (content_type, body) in [
        ("application/json", "{}"),
        ("application/xml", "<opts/>"),
        ("application/xml", "<opts></opts>"),
    ] {
        let ctx = BindContext::builder()
            .method(Method::POST)
            .path_param("node", "real_node")
            .header("content-type", content_type)
            .body(body)
            .build();

        let mut opts = Opts::default();
        DefaultBinder::new().bind(&mut opts, &ctx).unwrap();
        assert_eq!(opts.node, "real_node", "{content_type} {body}");
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Bind)]
#[serde(default)]
struct Audit {
    #[bind(header = "x-actor")]
    #[serde(skip)]
    actor: String,
    note: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Bind)]
#[serde(default)]
struct Tenanted {
    #[bind(path = "tenant")]
    #[serde(skip)]
    tenant: String,
    id: i64,
    audit: Audit,
    #[bind(skip)]
    #[serde(skip_deserializing)]
    trace_id: String,
}

#[test]
fn test_body_keeps_serde_skipped_fields() {
    for (content_type, body) in [
        ("application/json", r#"{"id":3,"audit":{"note":"n"},"trace_id":"body"}"#),
        (
            "application/xml",
            "<tenanted><id>3</id><audit><note>n</note></audit><trace_id>body</trace_id></tenanted>",
        ),
    ] {
        let ctx = BindContext::builder()
            .method(Method::POST)
            .path_param("tenant", "acme")
            .header("x-actor", "ops")
            .header("content-type", content_type)
            .body(body)
            .build();

        let binder = DefaultBinder::new();
        let mut dest = Tenanted {
            trace_id: "caller".to_string(),
            ..Tenanted::default()
        };
        binder.bind_headers(&mut dest, &ctx).unwrap();
        binder.bind(&mut dest, &ctx).unwrap();

        assert_eq!(dest.id, 3, "{content_type}");
        assert_eq!(dest.tenant, "acme", "{content_type}");
        assert_eq!(dest.audit.actor, "ops", "{content_type}");
        assert_eq!(dest.audit.note, "n", "{content_type}");
        assert_eq!(dest.trace_id, "caller", "{content_type}");
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Bind)]
#[serde(default)]
struct Precedence {
    #[bind(path = "v", query = "v", form = "v")]
    v: String,
    #[bind(form = "other")]
    other: String,
}

#[derive(Debug, Clone, Copy)]
enum Codec {
    Json,
    Xml,
    Form,
}

/// Builds a body that sets `v` when given, and always sets `other`.
fn precedence_body(codec: Codec, v: Option<&str>) -> (&'static str, String) {
    match (codec, v) {
        (Codec::Json, Some(v)) => ("application/json", format!(r#"{{"v":"{v}","other":"x"}}"#)),
        (Codec::Json, None) => ("application/json", r#"{"other":"x"}"#.to_string()),
        (Codec::Xml, Some(v)) => (
            "application/xml",
            format!("<precedence><v>{v}</v><other>x</other></precedence>"),
        ),
        (Codec::Xml, None) => (
            "application/xml",
            "<precedence><other>x</other></precedence>".to_string(),
        ),
        (Codec::Form, Some(v)) => ("application/x-www-form-urlencoded", format!("v={v}&other=x")),
        (Codec::Form, None) => ("application/x-www-form-urlencoded", "other=x".to_string()),
    }
}

proptest! {
    #[test]
    fn prop_later_sources_win(
        path in proptest::option::of("[a-z]{1,8}"),
        query in proptest::option::of("[a-z]{1,8}"),
        body in proptest::option::of(proptest::option::of("[a-z]{1,8}")),
        codec in prop_oneof![Just(Codec::Json), Just(Codec::Xml), Just(Codec::Form)],
    ) {
        let mut builder = BindContext::builder().method(Method::POST);
        if let Some(path) = &path {
            builder = builder.path_param("v", path.as_str());
        }
        if let Some(query) = &query {
            builder = builder.uri(format!("/?v={query}").parse().unwrap());
        }
        if let Some(body) = &body {
            let (content_type, payload) = precedence_body(codec, body.as_deref());
            builder = builder.header("content-type", content_type).body(payload);
        }

        let mut dest = Precedence::default();
        DefaultBinder::with_config(BinderConfig::default().query_binding(QueryBinding::Always))
            .bind(&mut dest, &builder.build())
            .unwrap();

        let expect = body.flatten().or(query).or(path).unwrap_or_default();
        prop_assert_eq!(dest.v, expect);
    }
}
