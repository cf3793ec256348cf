use bytes::Bytes;
use flate2::read::GzDecoder;
use http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_TYPE, EXPIRES, LOCATION};
use http::{Method, Request, Response, StatusCode};
use http_body_util::BodyExt;
use micro_expose::{
    Arg, Dispatcher, Encoding, Failure, FromParam, Handler, InvocationResult, Json, Param, Payload, Provider, Reader,
    Registry, RegistryBuilder, Reply, ResponseBody, ResponseOptions, SafeString, param, write_fn,
};
use serde::Serialize;
use std::io::{Read, Write};
use std::sync::Once;
use std::time::{Duration, SystemTime};

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).with_test_writer().init();
    });
}

/// A name that must not contain an apostrophe.
struct Name(String);

impl Arg for Name {
    fn check(&self) -> Result<(), Failure> {
        if self.0.contains('\'') { Err(Failure::generic("name in wrong format")) } else { Ok(()) }
    }
}

impl FromParam for Name {
    fn from_param(raw: &str) -> Result<Self, Failure> {
        Ok(Name(raw.to_owned()))
    }
}

/// An argument whose check always panics.
struct Fragile;

impl Arg for Fragile {
    fn check(&self) -> Result<(), Failure> {
        panic!("check bug")
    }
}

impl FromParam for Fragile {
    fn from_param(_raw: &str) -> Result<Self, Failure> {
        Ok(Fragile)
    }
}

#[derive(Serialize)]
struct Sum {
    a: i64,
    b: i64,
    sum: i64,
}

#[derive(Default)]
struct TestProvider {
    options: Option<ResponseOptions>,
}

impl TestProvider {
    fn with_options(options: ResponseOptions) -> Self {
        Self { options: Some(options) }
    }

    fn reply<T: Payload + 'static>(&self, payload: T) -> Reply {
        match &self.options {
            Some(options) => Reply::new(payload).with_options(options.clone()),
            None => Reply::new(payload),
        }
    }

    fn echo(&self, name: Name) -> Result<Reply, Failure> {
        Ok(self.reply(Reader(std::io::Cursor::new(format!("Echo {}", name.0)))))
    }

    fn greeting(&self) -> Result<Reply, Failure> {
        Ok(self.reply("Hello World"))
    }

    fn three_oh_three(&self) -> Result<Reply, Failure> {
        Err(Failure::see_other("http://lookhere"))
    }

    fn forbidden(&self) -> Result<Reply, Failure> {
        Err(Failure::redirect(StatusCode::FORBIDDEN, "Forbidden", "http://lookhere"))
    }

    fn broken(&self) -> Result<Reply, Failure> {
        Err(Failure::generic("connection to backend refused"))
    }

    fn add(&self, a: i64, b: i64) -> Result<Reply, Failure> {
        let options = ResponseOptions::default().with_content_type(mime::APPLICATION_JSON);
        Ok(Reply::new(Json(Sum { a, b, sum: a + b })).with_options(options))
    }

    fn nothing(&self) -> (Option<String>, Option<ResponseOptions>, Option<Failure>) {
        (None, None, None)
    }

    fn tuple(&self, name: SafeString) -> (Option<String>, Option<ResponseOptions>, Option<Failure>) {
        (Some(format!("Tuple {name}")), None, None)
    }

    fn panics(&self) -> InvocationResult {
        panic!("provider bug")
    }

    fn fragile(&self, _f: Fragile) -> Result<Reply, Failure> {
        Ok(Reply::new("unreachable"))
    }

    fn lazy(&self) -> Result<Reply, Failure> {
        Ok(Reply::new(write_fn(|out: &mut dyn Write| -> std::io::Result<u64> {
            out.write_all(b"partial")?;
            panic!("payload bug")
        })))
    }
}

impl Provider for TestProvider {
    fn expose(methods: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
        methods
            .add("Echo", (param("name"),), TestProvider::echo)
            .add("Greeting", (), TestProvider::greeting)
            .add("ThreeOhThree", (), TestProvider::three_oh_three)
            .add("Forbidden", (), TestProvider::forbidden)
            .add("Broken", (), TestProvider::broken)
            .add("Add", (param("a"), param("b")), TestProvider::add)
            .add("Nothing", (), TestProvider::nothing)
            .add("Tuple", (Param::with("name", |raw: &str| Ok(SafeString::new(raw))),), TestProvider::tuple)
            .add("Panics", (), TestProvider::panics)
            .add("Fragile", (param("f"),), TestProvider::fragile)
            .add(
                "Unbuildable",
                (Param::with("n", |_: &str| -> Result<SafeString, Failure> { panic!("constructor bug") }),),
                TestProvider::tuple,
            )
            .add("Lazy", (), TestProvider::lazy)
    }
}

fn dispatcher(provider: TestProvider) -> Dispatcher<TestProvider> {
    init_tracing();
    Dispatcher::from_provider(provider).unwrap()
}

fn get(uri: &str) -> Request<()> {
    Request::get(uri).body(()).unwrap()
}

fn get_accepting(uri: &str, accept_encoding: &'static str) -> Request<()> {
    Request::get(uri).header(ACCEPT_ENCODING, accept_encoding).body(()).unwrap()
}

async fn body(response: Response<ResponseBody>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn assert_generic_failure(dispatcher: &Dispatcher<TestProvider>, request: &Request<()>) {
    let response = dispatcher.serve(request);
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR, "{}", request.uri());
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    assert_eq!(response.body().bytes().map(Bytes::as_ref), Some(&b"error"[..]), "{}", request.uri());
}

#[tokio::test]
async fn echo() {
    let dispatcher = dispatcher(TestProvider::default());

    let response = dispatcher.serve(&get("http://host/Echo?name=Gopher"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/html");
    assert_eq!(body(response).await, "Echo Gopher");

    let response = dispatcher.serve(&get("http://host/path/Echo?name=Gopher"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, "Echo Gopher");

    let response = dispatcher.serve(&get("http://host/Ech%6F?name=G%C3%B6pher"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, "Echo Göpher");
}

#[test]
fn rejected_requests() {
    let dispatcher = dispatcher(TestProvider::default());

    for uri in [
        "http://host/",
        "http://host",
        "http://host/Nothere?name=Gopher",
        "http://host/Echo",
        "http://host/Echo?badparam=Gopher",
        "http://host/Echo?name=Go%27pher",
        "http://host/Echo?name=Gopher&name=Gopher",
        "http://host/Echo?name=Gopher&badparam=Gopher",
        "http://host/Greeting?name=Gopher",
        "http://host/Add?a=1",
        "http://host/Add?a=1&b=two",
        "http://host/Add?a=1&b=2&a=3",
        "http://host/Echo?name=%zz",
        "http://host/Echo?name=%FF",
        "http://host/Echo?name=Gopher%",
        "http://host/%FF?name=Gopher",
    ] {
        assert_generic_failure(&dispatcher, &get(uri));
    }
}

#[test]
fn unsupported_method_is_rejected() {
    let dispatcher = dispatcher(TestProvider::default());
    let request = Request::builder().method(Method::PUT).uri("http://host/Greeting").body(()).unwrap();
    assert_generic_failure(&dispatcher, &request);
}

#[tokio::test]
async fn greeting() {
    let dispatcher = dispatcher(TestProvider::default());

    let response = dispatcher.serve(&get("http://host/Greeting"));
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(EXPIRES).is_none());
    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(body(response).await, "Hello World");
}

#[tokio::test]
async fn see_other_sets_location() {
    let dispatcher = dispatcher(TestProvider::default());

    let response = dispatcher.serve(&get("http://host/ThreeOhThree"));
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "http://lookhere");
    assert_eq!(body(response).await, "See Other");
}

#[tokio::test]
async fn other_status_sets_no_location() {
    let dispatcher = dispatcher(TestProvider::default());

    let response = dispatcher.serve(&get("http://host/Forbidden"));
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get(LOCATION).is_none());
    assert_eq!(body(response).await, "Forbidden");
}

#[test]
fn generic_failure_hides_detail() {
    let dispatcher = dispatcher(TestProvider::default());
    assert_generic_failure(&dispatcher, &get("http://host/Broken"));
}

#[test]
fn missing_payload_is_generic_failure() {
    let dispatcher = dispatcher(TestProvider::default());
    assert_generic_failure(&dispatcher, &get("http://host/Nothing"));
}

#[test]
fn panicking_method_is_generic_failure() {
    let dispatcher = dispatcher(TestProvider::default());
    assert_generic_failure(&dispatcher, &get("http://host/Panics"));

    // the dispatcher keeps serving
    let response = dispatcher.serve(&get("http://host/Greeting"));
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn panicking_binding_is_generic_failure() {
    let dispatcher = dispatcher(TestProvider::default());
    assert_generic_failure(&dispatcher, &get("http://host/Fragile?f=x"));
    assert_generic_failure(&dispatcher, &get("http://host/Unbuildable?n=x"));

    let response = dispatcher.serve(&get("http://host/Echo?name=Gopher"));
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn panicking_payload_is_generic_failure() {
    let dispatcher = dispatcher(TestProvider::default());
    assert_generic_failure(&dispatcher, &get("http://host/Lazy"));
    assert_generic_failure(&dispatcher, &get_accepting("http://host/Lazy", "gzip"));

    let response = dispatcher.serve(&get("http://host/Greeting"));
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tuple_result_with_explicit_constructor() {
    let dispatcher = dispatcher(TestProvider::default());

    let response = dispatcher.serve(&get("http://host/Tuple?name=Gopher"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, "Tuple Gopher");

    assert_generic_failure(&dispatcher, &get("http://host/Tuple?name=%3Cscript%3E"));
}

#[tokio::test]
async fn json_payload() {
    let dispatcher = dispatcher(TestProvider::default());

    let response = dispatcher.serve(&get("http://host/Add?a=40&b=2"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

    let value: serde_json::Value = serde_json::from_slice(&body(response).await).unwrap();
    assert_eq!(value["sum"], 42);
}

#[test]
fn cache_sets_expires_for_get() {
    let dispatcher = dispatcher(TestProvider::with_options(ResponseOptions::default().with_cache(300)));

    let now = SystemTime::now();
    let response = dispatcher.serve(&get("http://host/Greeting"));
    assert_eq!(response.status(), StatusCode::OK);

    let expires = response.headers()[EXPIRES].to_str().unwrap();
    let expires = httpdate::parse_http_date(expires).unwrap();
    assert!(expires >= now);
    assert!(expires <= now + Duration::from_secs(301));
}

#[test]
fn cache_sets_no_expires_for_post() {
    let dispatcher = dispatcher(TestProvider::with_options(ResponseOptions::default().with_cache(300)));

    let request = Request::post("http://host/Greeting").body(()).unwrap();
    let response = dispatcher.serve(&request);
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(EXPIRES).is_none());
}

#[test]
fn no_cache_sets_no_expires() {
    let dispatcher = dispatcher(TestProvider::with_options(ResponseOptions::default().with_cache(0)));

    let response = dispatcher.serve(&get("http://host/Greeting"));
    assert!(response.headers().get(EXPIRES).is_none());
}

#[tokio::test]
async fn compression_when_accepted() {
    let dispatcher = dispatcher(TestProvider::with_options(ResponseOptions::default().with_compression(true)));

    let response = dispatcher.serve(&get_accepting("http://host/Greeting", "gzip"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_ENCODING], "gzip");

    let compressed = body(response).await;
    let mut decoded = String::new();
    GzDecoder::new(compressed.as_ref()).read_to_string(&mut decoded).unwrap();
    assert_eq!(decoded, "Hello World");
}

#[tokio::test]
async fn compression_when_not_accepted() {
    let dispatcher = dispatcher(TestProvider::with_options(ResponseOptions::default().with_compression(true)));

    let response = dispatcher.serve(&get("http://host/Greeting"));
    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(body(response).await, "Hello World");

    let response = dispatcher.serve(&get_accepting("http://host/Greeting", "gzip;q=0, identity"));
    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(body(response).await, "Hello World");
}

#[tokio::test]
async fn no_compression_unless_requested() {
    let dispatcher = dispatcher(TestProvider::default());

    let response = dispatcher.serve(&get_accepting("http://host/Greeting", "gzip"));
    assert!(response.headers().get(CONTENT_ENCODING).is_none());
    assert_eq!(body(response).await, "Hello World");
}

#[tokio::test]
async fn configured_encodings_in_preference_order() {
    init_tracing();
    let provider = TestProvider::with_options(ResponseOptions::default().with_compression(true));
    let dispatcher = Dispatcher::builder(Registry::<TestProvider>::for_provider().unwrap(), provider)
        .encodings([Encoding::Zstd, Encoding::Br, Encoding::Gzip])
        .build();

    let response = dispatcher.serve(&get_accepting("http://host/Greeting", "gzip, br, zstd"));
    assert_eq!(response.headers()[CONTENT_ENCODING], "zstd");
    let decoded = zstd::decode_all(body(response).await.as_ref()).unwrap();
    assert_eq!(decoded, b"Hello World");

    let response = dispatcher.serve(&get_accepting("http://host/Greeting", "gzip, br"));
    assert_eq!(response.headers()[CONTENT_ENCODING], "br");
    let compressed = body(response).await;
    let mut decoded = Vec::new();
    brotli::Decompressor::new(compressed.as_ref(), 4096).read_to_end(&mut decoded).unwrap();
    assert_eq!(decoded, b"Hello World");
}

#[tokio::test]
async fn default_options_apply_when_result_has_none() {
    init_tracing();
    let defaults = ResponseOptions::default().with_content_type(mime::TEXT_PLAIN_UTF_8).with_cache(60);
    let dispatcher =
        Dispatcher::builder(Registry::<TestProvider>::for_provider().unwrap(), TestProvider::default())
            .default_options(defaults.clone())
            .build();
    assert_eq!(dispatcher.default_options(), &defaults);

    let response = dispatcher.serve(&get("http://host/Greeting"));
    assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    assert!(response.headers().get(EXPIRES).is_some());

    // options carried by a result replace the defaults as a whole
    let response = dispatcher.serve(&get("http://host/Add?a=1&b=2"));
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    assert!(response.headers().get(EXPIRES).is_none());
}

#[tokio::test]
async fn handler_call() {
    let dispatcher = dispatcher(TestProvider::default());

    let request = Request::get("http://host/Echo?name=Gopher").body(Bytes::from_static(b"ignored")).unwrap();
    let response = dispatcher.call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, "Echo Gopher");
}
