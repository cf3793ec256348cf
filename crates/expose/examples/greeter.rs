use http::Request;
use http_body_util::BodyExt;
use micro_expose::{Dispatcher, Failure, Handler, Provider, RegistryBuilder, Reply, ResponseOptions, SafeString, param};
use tracing::{Level, info};

struct Greeter;

impl Greeter {
    fn greeting(&self) -> Result<Reply, Failure> {
        Ok(Reply::new("Hello World"))
    }

    fn echo(&self, name: SafeString) -> Result<Reply, Failure> {
        Ok(Reply::new(format!("Echo {name}")).with_options(ResponseOptions::default().with_cache(300)))
    }

    fn moved(&self) -> Result<Reply, Failure> {
        Err(Failure::see_other("/Greeting"))
    }
}

impl Provider for Greeter {
    fn expose(methods: RegistryBuilder<Self>) -> RegistryBuilder<Self> {
        methods
            .add("Greeting", (), Greeter::greeting)
            .add("Echo", (param("name"),), Greeter::echo)
            .add("Moved", (), Greeter::moved)
    }
}

#[tokio::main]
async fn main() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let dispatcher = Dispatcher::from_provider(Greeter).expect("registrations should be valid");

    for uri in ["/Greeting", "/Echo?name=Gopher", "/Echo?name=Go%27pher", "/Moved", "/Nothere"] {
        let request = Request::get(uri).body(()).unwrap();
        let response = dispatcher.call(request).await.unwrap();
        let status = response.status();
        let headers = format!("{:?}", response.headers());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        info!(uri, %status, %headers, body = %String::from_utf8_lossy(&body), "served");
    }
}
