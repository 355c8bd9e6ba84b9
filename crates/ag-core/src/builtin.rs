use crate::error::{AgError, Result};
use crate::handler::CommandHandler;

pub struct Builtin {
    pub name: String,
    pub summary: String,
    handler: Box<dyn CommandHandler>,
}

impl Builtin {
    pub fn handler(&self) -> &dyn CommandHandler {
        self.handler.as_ref()
    }
}

/// First-party commands, kept in registration order. Built-ins shadow any
/// plugin of the same name.
#[derive(Default)]
pub struct BuiltinTable {
    entries: Vec<Builtin>,
}

impl BuiltinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        summary: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> Result<()> {
        let name = name.into();
        if self.contains(&name) {
            return Err(AgError::DuplicateBuiltin(name));
        }
        self.entries.push(Builtin {
            name,
            summary: summary.into(),
            handler: Box::new(handler),
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Builtin> {
        self.entries.iter().find(|b| b.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Builtin> {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|b| b.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
