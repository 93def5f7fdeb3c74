use serde::{Deserialize, Serialize};

/// One option in the list. `value` identifies it, so two suggestions can't share a value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub value: String,
    /// Hover text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Shown instead of the value, if present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Suggestion {
    pub fn new(value: impl Into<String>) -> Suggestion {
        Suggestion {
            value: value.into(),
            title: None,
            display: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Suggestion {
        self.title = Some(title.into());
        self
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Suggestion {
        self.display = Some(display.into());
        self
    }

    pub fn label(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestID(pub usize);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: RequestID,
    pub query: String,
}

/// Looks up suggestions for a query. Answer right away with `Some`, or return `None` and pass
/// the results to `Combobox::deliver` with the request's ID once they arrive.
pub trait Fetcher {
    fn fetch(&mut self, request: &FetchRequest, data: &[Suggestion]) -> Option<Vec<Suggestion>>;
}

impl<F> Fetcher for F
where
    F: FnMut(&FetchRequest, &[Suggestion]) -> Option<Vec<Suggestion>>,
{
    fn fetch(&mut self, request: &FetchRequest, data: &[Suggestion]) -> Option<Vec<Suggestion>> {
        self(request, data)
    }
}

/// Keeps the static data whose value contains the query, ignoring case.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterData;

impl Fetcher for FilterData {
    fn fetch(&mut self, request: &FetchRequest, data: &[Suggestion]) -> Option<Vec<Suggestion>> {
        let query = request.query.to_lowercase();
        Some(
            data.iter()
                .filter(|x| x.value.to_lowercase().contains(&query))
                .cloned()
                .collect(),
        )
    }
}
