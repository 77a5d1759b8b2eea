use std::future::Future;

use chrono::NaiveDate;

use crate::error::DeskError;
use crate::forms::{FormContext, FormModel};
use crate::models::{EntityId, Stored};

pub enum EditorState<F: FormModel> {
    Hidden,
    Editing {
        form: F,
        /// Persisted copy for an existing entity, `None` for a new one.
        original: Option<Stored<F::Record>>,
    },
}

/// Form visibility and edit lifecycle shared by every entity form.
pub struct Editor<F: FormModel> {
    state: EditorState<F>,
}

impl<F: FormModel> Default for Editor<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FormModel> Editor<F> {
    pub fn new() -> Self {
        Self {
            state: EditorState::Hidden,
        }
    }

    pub fn state(&self) -> &EditorState<F> {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        matches!(self.state, EditorState::Editing { .. })
    }

    pub fn is_new(&self) -> bool {
        matches!(self.state, EditorState::Editing { original: None, .. })
    }

    pub fn editing_id(&self) -> Option<EntityId> {
        match &self.state {
            EditorState::Editing {
                original: Some(original),
                ..
            } => Some(original.id),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&F> {
        match &self.state {
            EditorState::Editing { form, .. } => Some(form),
            EditorState::Hidden => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut F> {
        match &mut self.state {
            EditorState::Editing { form, .. } => Some(form),
            EditorState::Hidden => None,
        }
    }

    /// Opens a fresh form with the type's defaults.
    pub fn add(&mut self, today: NaiveDate) {
        self.state = EditorState::Editing {
            form: F::blank(today),
            original: None,
        };
    }

    /// Opens the form on a persisted entity.
    pub fn select(&mut self, entity: Stored<F::Record>) {
        self.state = EditorState::Editing {
            form: F::from_record(&entity),
            original: Some(entity),
        };
    }

    /// Hides the form and returns the untouched persisted copy, if any.
    pub fn cancel(&mut self) -> Option<Stored<F::Record>> {
        match std::mem::replace(&mut self.state, EditorState::Hidden) {
            EditorState::Editing { original, .. } => original,
            EditorState::Hidden => None,
        }
    }

    /// Validates and hands the form to `persist`.
    ///
    /// The form stays open with its input intact when validation or
    /// persistence fails. Returns `Ok(None)` when no form is open.
    pub async fn save<P, Fut>(
        &mut self,
        today: NaiveDate,
        persist: P,
    ) -> Result<Option<Stored<F::Record>>, DeskError>
    where
        P: FnOnce(Option<EntityId>, F) -> Fut,
        Fut: Future<Output = Result<Stored<F::Record>, DeskError>>,
    {
        let (form, id) = match &self.state {
            EditorState::Editing { form, original } => {
                (form.clone(), original.as_ref().map(|entity| entity.id))
            }
            EditorState::Hidden => return Ok(None),
        };

        form.validate(&FormContext::new(today, id.is_none()))?;
        let saved = persist(id, form).await?;
        self.state = EditorState::Hidden;
        Ok(Some(saved))
    }
}
