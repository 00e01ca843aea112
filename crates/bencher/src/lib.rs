#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    table: RouteFixture,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, table: RouteFixture) -> Self {
        Self { name, group, table }
    }

    pub fn small(name: &'static str, table: RouteFixture) -> Self {
        Self::new(name, TestGroup::Small, table)
    }

    pub fn normal(name: &'static str, table: RouteFixture) -> Self {
        Self::new(name, TestGroup::Normal, table)
    }

    pub fn large(name: &'static str, table: RouteFixture) -> Self {
        Self::new(name, TestGroup::Large, table)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn table(&self) -> &RouteFixture {
        &self.table
    }
}

/// A route table to benchmark and the path requested from it.
///
/// `path` is expected to match the last pattern, so a scan visits every route.
#[derive(Debug, Copy, Clone)]
pub struct RouteFixture {
    patterns: &'static [&'static str],
    path: &'static str,
}

impl RouteFixture {
    pub const fn new(patterns: &'static [&'static str], path: &'static str) -> Self {
        Self { patterns, path }
    }

    pub fn patterns(&self) -> &'static [&'static str] {
        self.patterns
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}
