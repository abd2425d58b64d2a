use std::time::Duration;

use crate::error::{DispatchError, Result};

/// A menu entry: the kind name clients order by and its base preparation
/// time for a single unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Dish {
    pub name: String,
    pub base_time: Duration,
}

impl Dish {
    pub fn new(name: impl Into<String>, base_time: Duration) -> Self {
        Self {
            name: name.into(),
            base_time,
        }
    }
}

/// The fixed set of known job kinds.
#[derive(Debug, Clone)]
pub struct Menu {
    dishes: Vec<Dish>,
}

impl Default for Menu {
    fn default() -> Self {
        Self::standard()
    }
}

impl Menu {
    pub fn new(dishes: Vec<Dish>) -> Self {
        Self { dishes }
    }

    /// The house menu served by the dispatch server.
    pub fn standard() -> Self {
        Self::new(vec![
            Dish::new("pizza", Duration::from_millis(2000)),
            Dish::new("burger", Duration::from_millis(1500)),
            Dish::new("salad", Duration::from_millis(800)),
            Dish::new("soup", Duration::from_millis(1200)),
            Dish::new("lasagna", Duration::from_millis(3000)),
            Dish::new("sandwich", Duration::from_millis(1000)),
        ])
    }

    pub fn get(&self, kind: &str) -> Option<&Dish> {
        self.dishes.iter().find(|d| d.name == kind)
    }

    /// Like [`Menu::get`], but reports an unknown kind together with the
    /// valid menu so the client can correct itself.
    pub fn lookup(&self, kind: &str) -> Result<&Dish> {
        self.get(kind).ok_or_else(|| DispatchError::UnknownKind {
            kind: kind.to_string(),
            menu: self.names(),
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.dishes.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.dishes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dishes.is_empty()
    }
}
