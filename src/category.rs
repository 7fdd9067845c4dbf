use std::fmt;
use std::str::FromStr;

/// The closed set of capture categories. Each has its own source table,
/// destination table and payload shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Irregularities,
    Jams,
    Alerts,
}

impl Category {
    /// All categories, in the default export order.
    pub const ALL: [Category; 3] = [Category::Irregularities, Category::Jams, Category::Alerts];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Irregularities => "irregularities",
            Category::Jams => "jams",
            Category::Alerts => "alerts",
        }
    }

    /// Table name, identical in the source and destination stores.
    pub fn table(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "irregularities" => Ok(Category::Irregularities),
            "jams" => Ok(Category::Jams),
            "alerts" => Ok(Category::Alerts),
            other => Err(format!("unknown category: {other}")),
        }
    }
}
