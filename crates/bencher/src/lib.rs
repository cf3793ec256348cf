#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    request: TestRequest,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, request: TestRequest) -> Self {
        Self { name, group, request }
    }

    pub fn small(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Small, request)
    }

    pub fn normal(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Normal, request)
    }

    pub fn large(name: &'static str, request: TestRequest) -> Self {
        Self::new(name, TestGroup::Large, request)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn request(&self) -> &TestRequest {
        &self.request
    }

    pub fn uri(&self) -> &'static str {
        self.request().uri
    }
}

/// The parts of a request a dispatch benchmark varies.
#[derive(Debug, Copy, Clone)]
pub struct TestRequest {
    uri: &'static str,
    accept_encoding: Option<&'static str>,
}

impl TestRequest {
    pub const fn get(uri: &'static str) -> Self {
        Self { uri, accept_encoding: None }
    }

    #[must_use]
    pub const fn accepting(mut self, accept_encoding: &'static str) -> Self {
        self.accept_encoding = Some(accept_encoding);
        self
    }

    pub fn uri(&self) -> &'static str {
        self.uri
    }

    pub fn accept_encoding(&self) -> Option<&'static str> {
        self.accept_encoding
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}
