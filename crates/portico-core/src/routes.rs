use portico_common::ServiceConfig;

/// A declared route path, split into literal and `{param}` segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.starts_with('{') && s.ends_with('}') {
                    Segment::Param
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();
        Self { segments }
    }

    /// Segment-wise match; a `{param}` segment matches exactly one segment.
    pub fn matches(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return false;
        }
        self.segments.iter().zip(parts).all(|(seg, part)| match seg {
            Segment::Literal(lit) => lit == part,
            Segment::Param => true,
        })
    }
}

/// A configured downstream service with its parsed route table.
#[derive(Debug, Clone)]
pub struct ServiceEntry {
    pub name: String,
    pub base_url: String,
    pub routes: Vec<RoutePattern>,
}

impl ServiceEntry {
    pub fn from_config(name: &str, config: &ServiceConfig) -> Self {
        Self {
            name: name.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            routes: config
                .routes
                .iter()
                .map(|route| RoutePattern::parse(&route.path))
                .collect(),
        }
    }

    pub fn allows(&self, path: &str) -> bool {
        self.routes.iter().any(|route| route.matches(path))
    }
}
