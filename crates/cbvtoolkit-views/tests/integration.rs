//! Integration tests for the CSV download and multi-form views.
//!
//! Tests cover:
//! 1. CSV body shape: header row, then one row per record in column order
//! 2. CSV response headers, including the header-only case
//! 3. Multi-form read: every configured form present and unbound
//! 4. Unknown form names are rejected without running callbacks
//! 5. Invalid submissions re-render with only the submitted form bound
//! 6. Valid submissions run the callback once and redirect
//! 7. Per-form instance factories on read
//! 8. Tera templates and the axum app end to end

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::response::IntoResponse;
use http::{header, Method, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use cbvtoolkit_core::settings::TemplateSettings;
use cbvtoolkit_core::{Settings, ToolkitError, ToolkitResult};
use cbvtoolkit_forms::{BaseForm, Form, FormDefinition, FormFieldDef, FormFieldType};
use cbvtoolkit_http::{HttpRequest, HttpResponse};
use cbvtoolkit_views::{
    CbvApp, CsvDownloadView, CsvSource, FormSpec, MultiFormView, Records, TeraRenderer, View,
};

// ============================================================================
// Fixtures
// ============================================================================

struct People {
    rows: Vec<Vec<(&'static str, &'static str)>>,
}

#[async_trait]
impl CsvSource for People {
    fn columns(&self) -> ToolkitResult<Vec<String>> {
        Ok(vec!["name".into(), "role".into(), "note".into()])
    }

    fn filename(&self) -> ToolkitResult<String> {
        Ok("people.csv".into())
    }

    async fn get_csv_data(&self, _request: &HttpRequest) -> ToolkitResult<Records> {
        let records: Vec<HashMap<String, String>> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect()
            })
            .collect();
        Ok(Box::new(records.into_iter()))
    }
}

fn parse_csv(body: &[u8]) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(body)
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

struct EmailForm;

impl FormDefinition for EmailForm {
    fn fields() -> Vec<FormFieldDef> {
        vec![FormFieldDef::new("email", FormFieldType::Email)]
    }
}

struct UsernameForm;

impl FormDefinition for UsernameForm {
    fn fields() -> Vec<FormFieldDef> {
        vec![FormFieldDef::new(
            "username",
            FormFieldType::Char {
                min_length: Some(3),
                max_length: Some(20),
                strip: true,
            },
        )]
    }
}

/// Records every callback invocation as `(form_name, cleaned_data)`.
type CallLog = Arc<Mutex<Vec<(String, HashMap<String, Value>)>>>;

fn logging_spec<D: FormDefinition>(name: &'static str, log: &CallLog) -> FormSpec {
    let log = log.clone();
    FormSpec::of::<D>().on_valid(move |form: Box<dyn Form>| {
        log.lock()
            .unwrap()
            .push((name.to_string(), form.cleaned_data().clone()));
        async { Ok(()) }
    })
}

fn account_view(log: &CallLog) -> MultiFormView {
    MultiFormView::builder()
        .template_name("account.html")
        .success_url("/account/")
        .form(logging_spec::<EmailForm>("emailform", log).success_url("/account/email/done/"))
        .form(logging_spec::<UsernameForm>("usernameform", log))
        .build()
        .unwrap()
}

fn forms_context(response: &HttpResponse) -> &serde_json::Map<String, Value> {
    response.context_data().unwrap()["forms"].as_object().unwrap()
}

// ============================================================================
// 1-2. CSV downloads
// ============================================================================

#[tokio::test]
async fn test_csv_rows_follow_columns() {
    let view = CsvDownloadView::new(People {
        rows: vec![
            vec![("role", "engineer"), ("name", "Ada"), ("note", "first, \"quoted\"")],
            vec![("note", ""), ("name", "Grace"), ("role", "admiral"), ("extra", "ignored")],
        ],
    });
    let response = view.dispatch(HttpRequest::builder().build()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rows = parse_csv(&response.content_bytes());
    assert_eq!(
        rows,
        vec![
            vec!["name", "role", "note"],
            vec!["Ada", "engineer", "first, \"quoted\""],
            vec!["Grace", "admiral", ""],
        ]
    );
}

#[tokio::test]
async fn test_csv_headers_with_zero_records() {
    let view = CsvDownloadView::new(People { rows: Vec::new() });
    let response = view.dispatch(HttpRequest::builder().build()).await.unwrap();

    assert_eq!(response.content_type(), "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"people.csv\""
    );
    assert_eq!(parse_csv(&response.content_bytes()), vec![vec!["name", "role", "note"]]);

    let wire = response.into_response();
    assert_eq!(wire.headers()[header::CONTENT_TYPE], "text/csv");
}

#[tokio::test]
async fn test_csv_missing_column_is_error() {
    let view = CsvDownloadView::new(People {
        rows: vec![vec![("name", "Ada"), ("role", "engineer")]],
    });
    let err = view.dispatch(HttpRequest::builder().build()).await.unwrap_err();
    assert!(matches!(err, ToolkitError::MissingColumn { ref column, row: 0 } if column == "note"));
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_csv_head_and_post() {
    let view = CsvDownloadView::new(People {
        rows: vec![vec![("name", "Ada"), ("role", "engineer"), ("note", "")]],
    });

    let head = view
        .dispatch(HttpRequest::builder().method(Method::HEAD).build())
        .await
        .unwrap();
    assert_eq!(head.status(), StatusCode::OK);
    assert!(head.content_bytes().is_empty());
    assert!(head.headers().contains_key(header::CONTENT_DISPOSITION));

    let post = view
        .dispatch(HttpRequest::builder().method(Method::POST).build())
        .await
        .unwrap();
    assert_eq!(post.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_csv_unconfigured_source_fails_fast() {
    struct Unconfigured;

    #[async_trait]
    impl CsvSource for Unconfigured {
        async fn get_csv_data(&self, _request: &HttpRequest) -> ToolkitResult<Records> {
            Ok(Box::new(std::iter::empty()))
        }
    }

    let err = CsvDownloadView::new(Unconfigured)
        .dispatch(HttpRequest::builder().build())
        .await
        .unwrap_err();
    assert!(err.is_programming_error());
}

// ============================================================================
// 3. Multi-form read
// ============================================================================

#[tokio::test]
async fn test_read_exposes_every_form_unbound() {
    let log = CallLog::default();
    let view = account_view(&log);
    let response = view.dispatch(HttpRequest::builder().build()).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.template_name(), Some("account.html"));
    let forms = forms_context(&response);
    assert_eq!(forms.len(), 2);
    assert!(forms.contains_key("emailform"));
    assert!(forms.contains_key("usernameform"));
    assert!(forms.values().all(|f| f["is_bound"] == json!(false)));
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_read_with_bound_override() {
    let log = CallLog::default();
    let view = account_view(&log);
    let request = HttpRequest::builder().build();

    let mut prefilled = BaseForm::from_definition::<EmailForm>();
    let data = cbvtoolkit_http::QueryDict::parse("email=not-an-email");
    prefilled.bind(&data);
    assert!(!prefilled.is_valid().await);

    let mut overrides = cbvtoolkit_views::FormMap::new();
    overrides.insert("emailform".to_string(), Box::new(prefilled));
    let response = view.handle_read(&request, overrides).await.unwrap();

    let forms = forms_context(&response);
    assert_eq!(forms["emailform"]["is_bound"], json!(true));
    assert!(!forms["emailform"]["errors"]["email"].as_array().unwrap().is_empty());
    assert_eq!(forms["usernameform"]["is_bound"], json!(false));
}

// ============================================================================
// 4. Unknown form names
// ============================================================================

#[tokio::test]
async fn test_unknown_form_name_forbidden() {
    let log = CallLog::default();
    let view = account_view(&log);

    for name in ["passwordform", "EmailForm", ""] {
        let request = HttpRequest::builder()
            .form([("form_name", name), ("email", "ada@example.com")])
            .build();
        let response = view.dispatch(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "form_name={name:?}");
    }
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_form_name_in_query_string_is_not_enough() {
    let log = CallLog::default();
    let view = account_view(&log);
    let request = HttpRequest::builder()
        .query_string("form_name=emailform")
        .form([("email", "ada@example.com")])
        .build();
    let response = view.dispatch(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// 5. Invalid submissions
// ============================================================================

#[tokio::test]
async fn test_invalid_submission_rerenders() {
    let log = CallLog::default();
    let view = account_view(&log);
    let request = HttpRequest::builder()
        .form([("form_name", "usernameform"), ("username", "ab")])
        .build();
    let response = view.dispatch(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let forms = forms_context(&response);
    let username = &forms["usernameform"];
    assert_eq!(username["is_bound"], json!(true));
    assert_eq!(username["fields"][0]["value"], json!("ab"));
    assert!(!username["fields"][0]["errors"].as_array().unwrap().is_empty());
    assert_eq!(forms["emailform"]["is_bound"], json!(false));
    assert!(log.lock().unwrap().is_empty());
}

// ============================================================================
// 6. Valid submissions
// ============================================================================

#[tokio::test]
async fn test_valid_submission_uses_per_form_url() {
    let log = CallLog::default();
    let view = account_view(&log);
    let request = HttpRequest::builder()
        .form([("form_name", "emailform"), ("email", "ada@example.com")])
        .build();
    let response = view.dispatch(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/account/email/done/");

    let calls = log.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "emailform");
    assert_eq!(calls[0].1["email"], json!("ada@example.com"));
}

#[tokio::test]
async fn test_valid_submission_uses_default_url() {
    let log = CallLog::default();
    let view = account_view(&log);
    let request = HttpRequest::builder()
        .form([("form_name", "usernameform"), ("username", "  ada  ")])
        .build();
    let response = view.dispatch(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/account/");

    let calls = log.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1["username"], json!("ada"));
}

#[tokio::test]
async fn test_bound_form_ignores_instance_factory() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let view = MultiFormView::builder()
        .template_name("account.html")
        .success_url("/account/")
        .form(
            FormSpec::of::<EmailForm>()
                .instance_factory(move |_request| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Box::new(BaseForm::from_definition::<EmailForm>())
                })
                .on_valid(|_form| async { Ok(()) }),
        )
        .build()
        .unwrap();

    let request = HttpRequest::builder()
        .form([("form_name", "emailform"), ("email", "ada@example.com")])
        .build();
    let response = view.dispatch(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(built.load(Ordering::SeqCst), 0);
}

// ============================================================================
// 7. Instance factories
// ============================================================================

#[tokio::test]
async fn test_instance_factory_used_on_read() {
    let log = CallLog::default();
    let view = MultiFormView::builder()
        .template_name("account.html")
        .success_url("/account/")
        .form(logging_spec::<EmailForm>("emailform", &log))
        .form(
            logging_spec::<UsernameForm>("usernameform", &log).instance_factory(|request| {
                let current = request.get().get("user").unwrap_or("anonymous").to_string();
                Box::new(
                    BaseForm::from_definition::<UsernameForm>()
                        .with_initial(HashMap::from([("username".to_string(), json!(current))])),
                )
            }),
        )
        .build()
        .unwrap();

    let request = HttpRequest::builder().query_string("user=ada").build();
    let response = view.dispatch(request).await.unwrap();
    let forms = forms_context(&response);
    assert_eq!(forms["usernameform"]["fields"][0]["value"], json!("ada"));
    assert_eq!(forms["usernameform"]["initial"]["username"], json!("ada"));
    assert_eq!(forms["emailform"]["fields"][0]["value"], Value::Null);
}

#[tokio::test]
async fn test_instance_factory_used_for_other_slots_on_rerender() {
    let log = CallLog::default();
    let view = MultiFormView::builder()
        .template_name("account.html")
        .success_url("/account/")
        .form(logging_spec::<EmailForm>("emailform", &log))
        .form(
            logging_spec::<UsernameForm>("usernameform", &log).instance_factory(|_request| {
                Box::new(
                    BaseForm::from_definition::<UsernameForm>()
                        .with_initial(HashMap::from([("username".to_string(), json!("ada"))])),
                )
            }),
        )
        .build()
        .unwrap();

    let request = HttpRequest::builder()
        .form([("form_name", "emailform"), ("email", "nope")])
        .build();
    let response = view.dispatch(request).await.unwrap();
    let forms = forms_context(&response);
    assert_eq!(forms["emailform"]["is_bound"], json!(true));
    assert_eq!(forms["usernameform"]["fields"][0]["value"], json!("ada"));
}

// ============================================================================
// 8. Tera and the axum app
// ============================================================================

const ACCOUNT_TEMPLATE: &str = "\
<h1>{{ title }}</h1>
{% for name, form in forms %}<form id=\"{{ name }}\">\
{% for field in form.fields %}{{ field.name }}={{ field.value | default(value=\"\") }}\
{% for e in field.errors %}[{{ e }}]{% endfor %}{% endfor %}</form>
{% endfor %}";

fn tera_view(log: &CallLog, renderer: TeraRenderer) -> MultiFormView {
    MultiFormView::builder()
        .template_name("account.html")
        .renderer(Arc::new(renderer))
        .context_builder(|_request, context| {
            context.insert("title".into(), json!("Account"));
        })
        .success_url("/account/")
        .form(logging_spec::<EmailForm>("emailform", log))
        .form(logging_spec::<UsernameForm>("usernameform", log))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_tera_renders_forms() {
    let mut renderer = TeraRenderer::new();
    renderer
        .add_string_template("account.html", ACCOUNT_TEMPLATE)
        .unwrap();
    let log = CallLog::default();
    let view = tera_view(&log, renderer);

    let request = HttpRequest::builder()
        .form([("form_name", "emailform"), ("email", "nope")])
        .build();
    let response = view.dispatch(request).await.unwrap();
    let body = String::from_utf8(response.content_bytes()).unwrap();

    assert!(body.contains("<h1>Account</h1>"));
    assert!(body.contains("<form id=\"emailform\">email=nope["));
    assert!(body.contains("<form id=\"usernameform\">username=</form>"));
}

#[tokio::test]
async fn test_missing_template_is_error() {
    let log = CallLog::default();
    let view = tera_view(&log, TeraRenderer::new());
    let err = view.dispatch(HttpRequest::builder().build()).await.unwrap_err();
    assert!(matches!(err, ToolkitError::TemplateDoesNotExist(ref name) if name == "account.html"));
}

#[tokio::test]
async fn test_app_serves_both_views() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("account.html"), ACCOUNT_TEMPLATE).unwrap();
    let renderer = TeraRenderer::from_settings(&TemplateSettings {
        dirs: vec![dir.path().to_path_buf()],
    })
    .unwrap();
    assert!(renderer.has_template("account.html"));

    let log = CallLog::default();
    let router = CbvApp::new(Settings::default())
        .route("/account/", tera_view(&log, renderer))
        .route(
            "/people.csv",
            CsvDownloadView::new(People {
                rows: vec![vec![("name", "Ada"), ("role", "engineer"), ("note", "")]],
            }),
        )
        .into_axum_router();

    let response = router
        .clone()
        .oneshot(
            http::Request::builder()
                .method("POST")
                .uri("/account/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("form_name=usernameform&username=grace"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/account/");
    assert_eq!(log.lock().unwrap().len(), 1);

    let response = router
        .oneshot(http::Request::builder().uri("/people.csv").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv"
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"name,role,note\r\nAda,engineer,\r\n");
}

#[tokio::test]
async fn test_app_forbids_unknown_form() {
    let mut renderer = TeraRenderer::new();
    renderer
        .add_string_template("account.html", ACCOUNT_TEMPLATE)
        .unwrap();
    let log = CallLog::default();
    let router = CbvApp::new(Settings::default())
        .route("/account/", tera_view(&log, renderer))
        .into_axum_router();

    let response = router
        .oneshot(
            http::Request::builder()
                .method("POST")
                .uri("/account/")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("form_name=passwordform"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_app_accepts_mixed_case_form_media_type() {
    let mut renderer = TeraRenderer::new();
    renderer
        .add_string_template("account.html", ACCOUNT_TEMPLATE)
        .unwrap();
    let log = CallLog::default();
    let router = CbvApp::new(Settings::default())
        .route("/account/", tera_view(&log, renderer))
        .into_axum_router();

    let response = router
        .oneshot(
            http::Request::builder()
                .method("POST")
                .uri("/account/")
                .header(header::CONTENT_TYPE, "Application/x-www-form-urlencoded; charset=UTF-8")
                .body(Body::from("form_name=emailform&email=ada%40example.com"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/account/");
    assert_eq!(log.lock().unwrap().len(), 1);
}
