use strum_macros::{Display, EnumIter, EnumString};

use crate::environment::subscription::Subscription;
use crate::environment::types::{ClientId, Talk, TalkId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum FormField {
    Name,
    Description,
    SpeakerName,
    SpeakerBio,
}

/// The text the user typed for the next talk
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormState {
    pub name: String,
    pub description: String,
    pub speaker_name: String,
    pub speaker_bio: String,
}

impl FormState {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name,
            FormField::Description => &self.description,
            FormField::SpeakerName => &self.speaker_name,
            FormField::SpeakerBio => &self.speaker_bio,
        }
    }

    pub fn set(&mut self, field: FormField, value: String) {
        let slot = match field {
            FormField::Name => &mut self.name,
            FormField::Description => &mut self.description,
            FormField::SpeakerName => &mut self.speaker_name,
            FormField::SpeakerBio => &mut self.speaker_bio,
        };
        *slot = value;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// All four fields have to be filled in before a talk can be created
    pub fn is_complete(&self) -> bool {
        !(self.name.is_empty()
            || self.description.is_empty()
            || self.speaker_name.is_empty()
            || self.speaker_bio.is_empty())
    }

    pub fn to_talk(&self, id: TalkId, client_id: ClientId) -> Talk {
        Talk {
            id,
            name: self.name.clone(),
            description: self.description.clone(),
            speaker_name: self.speaker_name.clone(),
            speaker_bio: self.speaker_bio.clone(),
            client_id,
        }
    }
}

/// Talks in display order. Never holds two talks with the same id.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TalkList(im::Vector<Talk>);

impl TalkList {
    pub fn new(talks: impl IntoIterator<Item = Talk>) -> Self {
        let mut list = Self::default();
        for talk in talks {
            list.add(talk);
        }
        list
    }

    /// Appends `talk`, or replaces the talk with the same id in place
    pub fn add(&mut self, talk: Talk) {
        match self.position(&talk.id) {
            Some(index) => {
                self.0.set(index, talk);
            }
            None => self.0.push_back(talk),
        }
    }

    pub fn delete(&mut self, id: &TalkId) -> Option<Talk> {
        let index = self.position(id)?;
        Some(self.0.remove(index))
    }

    pub fn at(&self, index: usize) -> Option<&Talk> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Talk> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn position(&self, id: &TalkId) -> Option<usize> {
        self.0.iter().position(|talk| &talk.id == id)
    }
}

#[derive(Debug, Default)]
pub struct TalkState {
    pub form: FormState,
    pub talks: TalkList,
    /// A full reload is in flight
    pub loading: bool,
    pub mounted: bool,
    pub subscription: Option<Subscription>,
    /// A released subscription is still shutting down
    pub closing: bool,
}

// Transitions. None of them can fail.

impl TalkState {
    pub fn set_field(&mut self, field: FormField, value: String) {
        self.form.set(field, value);
    }

    pub fn clear_form(&mut self) {
        self.form.clear();
    }

    pub fn replace_all(&mut self, talks: Vec<Talk>) {
        self.talks = TalkList::new(talks);
    }

    pub fn add_talk(&mut self, talk: Talk) {
        self.talks.add(talk);
    }

    pub fn delete_talk(&mut self, id: &TalkId) -> Option<Talk> {
        self.talks.delete(id)
    }
}
