//! Profile / résumé aggregate.
//!
//! # Responsibility
//! - Hold the owner's profile scalars and its three child collections.
//! - Assemble a profile from legacy single-field cache records.
//!
//! # Invariants
//! - The profile id is the owner's id and is always durable.
//! - Child entry ids are unique within their section.
//! - Session fields (name, email, phone) override stored values on load.

use crate::model::aggregate::{merge_field, Aggregate, AggregateKind, OwnerScoped};
use crate::model::identifier::AggregateId;
use crate::model::session::SessionIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Child collection of a profile; also the remote path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildKind {
    Education,
    Experience,
    Project,
}

impl ChildKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Education => "education",
            Self::Experience => "experience",
            Self::Project => "project",
        }
    }
}

impl Display for ChildKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One education, experience or project row.
///
/// `organization` is the school, company or project name; `role` is the
/// degree, job title or the owner's part in the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub id: AggregateId,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub started_on: Option<String>,
    #[serde(default)]
    pub ended_on: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl ProfileEntry {
    /// Creates an unsaved entry with a fresh temporary id.
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            id: AggregateId::mint_temporary(),
            organization: organization.into(),
            role: String::new(),
            started_on: None,
            ended_on: None,
            description: String::new(),
            url: None,
        }
    }

    fn apply(&mut self, patch: EntryPatch) {
        merge_field(&mut self.organization, patch.organization);
        merge_field(&mut self.role, patch.role);
        merge_field(&mut self.description, patch.description);
        if patch.started_on.is_some() {
            self.started_on = patch.started_on;
        }
        if patch.ended_on.is_some() {
            self.ended_on = patch.ended_on;
        }
        if patch.url.is_some() {
            self.url = patch.url;
        }
    }
}

/// Partial update for one child entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub organization: Option<String>,
    pub role: Option<String>,
    pub started_on: Option<String>,
    pub ended_on: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

/// Child collection edit carried by a `ProfilePatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryEdit {
    Insert(ChildKind, ProfileEntry),
    Update(ChildKind, AggregateId, EntryPatch),
    Remove(ChildKind, AggregateId),
}

/// External links shown on the profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLinks {
    pub github_url: Option<String>,
    pub blog_url: Option<String>,
    pub portfolio_url: Option<String>,
}

/// Owner profile used by the résumé editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: AggregateId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub introduction: String,
    #[serde(default)]
    pub desired_job: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub links: ProfileLinks,
    #[serde(default)]
    pub education: Vec<ProfileEntry>,
    #[serde(default)]
    pub experience: Vec<ProfileEntry>,
    #[serde(default)]
    pub projects: Vec<ProfileEntry>,
    #[serde(default)]
    pub last_modified_at: i64,
}

/// Partial profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub headline: Option<String>,
    pub introduction: Option<String>,
    pub desired_job: Option<String>,
    pub skills: Option<Vec<String>>,
    pub links: Option<ProfileLinks>,
    pub entries: Vec<EntryEdit>,
}

impl Profile {
    /// Returns the child collection for `kind`.
    pub fn entries(&self, kind: ChildKind) -> &[ProfileEntry] {
        match kind {
            ChildKind::Education => &self.education,
            ChildKind::Experience => &self.experience,
            ChildKind::Project => &self.projects,
        }
    }

    pub fn entries_mut(&mut self, kind: ChildKind) -> &mut Vec<ProfileEntry> {
        match kind {
            ChildKind::Education => &mut self.education,
            ChildKind::Experience => &mut self.experience,
            ChildKind::Project => &mut self.projects,
        }
    }

    pub fn entry(&self, kind: ChildKind, id: &AggregateId) -> Option<&ProfileEntry> {
        self.entries(kind).iter().find(|entry| &entry.id == id)
    }

    /// Re-keys one child entry. Returns whether the entry was found.
    pub fn replace_entry_id(
        &mut self,
        kind: ChildKind,
        old: &AggregateId,
        new: &AggregateId,
    ) -> bool {
        match self
            .entries_mut(kind)
            .iter_mut()
            .find(|entry| &entry.id == old)
        {
            Some(entry) => {
                entry.id = new.clone();
                true
            }
            None => false,
        }
    }

    fn apply_entry_edit(&mut self, edit: EntryEdit) {
        match edit {
            EntryEdit::Insert(kind, entry) => {
                let entries = self.entries_mut(kind);
                if !entries.iter().any(|existing| existing.id == entry.id) {
                    entries.push(entry);
                }
            }
            EntryEdit::Update(kind, id, patch) => {
                if let Some(entry) = self
                    .entries_mut(kind)
                    .iter_mut()
                    .find(|entry| entry.id == id)
                {
                    entry.apply(patch);
                }
            }
            EntryEdit::Remove(kind, id) => {
                self.entries_mut(kind).retain(|entry| entry.id != id);
            }
        }
    }
}

impl Aggregate for Profile {
    type Patch = ProfilePatch;

    const KIND: AggregateKind = AggregateKind::Profile;
    const OWNER_KEYED: bool = true;

    fn id(&self) -> &AggregateId {
        &self.id
    }

    fn set_id(&mut self, id: AggregateId) {
        self.id = id;
    }

    fn apply_patch(&mut self, patch: ProfilePatch) {
        merge_field(&mut self.name, patch.name);
        merge_field(&mut self.email, patch.email);
        merge_field(&mut self.phone, patch.phone);
        merge_field(&mut self.headline, patch.headline);
        merge_field(&mut self.introduction, patch.introduction);
        merge_field(&mut self.desired_job, patch.desired_job);
        merge_field(&mut self.skills, patch.skills);
        merge_field(&mut self.links, patch.links);
        for edit in patch.entries {
            self.apply_entry_edit(edit);
        }
    }

    fn last_modified_at(&self) -> i64 {
        self.last_modified_at
    }

    fn set_last_modified_at(&mut self, at_ms: i64) {
        self.last_modified_at = at_ms;
    }
}

impl OwnerScoped for Profile {
    const LEGACY_FIELDS: &'static [&'static str] = &[
        "introduction",
        "headline",
        "skills",
        "desired_job",
        "github_url",
        "blog_url",
        "portfolio_url",
    ];

    fn defaults(owner_id: &str) -> Self {
        Self {
            id: AggregateId::durable(owner_id),
            name: String::new(),
            email: String::new(),
            phone: String::new(),
            headline: String::new(),
            introduction: String::new(),
            desired_job: String::new(),
            skills: Vec::new(),
            links: ProfileLinks::default(),
            education: Vec::new(),
            experience: Vec::new(),
            projects: Vec::new(),
            last_modified_at: 0,
        }
    }

    fn from_legacy(owner_id: &str, fields: &BTreeMap<String, String>) -> Self {
        let mut profile = Self::defaults(owner_id);
        let text = |field: &str| fields.get(field).cloned();

        merge_field(&mut profile.introduction, text("introduction"));
        merge_field(&mut profile.headline, text("headline"));
        merge_field(&mut profile.desired_job, text("desired_job"));
        if let Some(raw) = fields.get("skills") {
            profile.skills = parse_legacy_list(raw);
        }
        profile.links = ProfileLinks {
            github_url: text("github_url"),
            blog_url: text("blog_url"),
            portfolio_url: text("portfolio_url"),
        };
        profile
    }

    fn apply_session(&mut self, session: &SessionIdentity) {
        merge_field(&mut self.name, session.name.clone());
        merge_field(&mut self.email, session.email.clone());
        merge_field(&mut self.phone, session.phone.clone());
    }
}

/// Legacy list fields were stored either as a JSON array or comma separated.
fn parse_legacy_list(raw: &str) -> Vec<String> {
    if let Ok(values) = serde_json::from_str::<Vec<String>>(raw) {
        return values
            .into_iter()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}
