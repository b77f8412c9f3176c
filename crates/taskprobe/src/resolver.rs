//! Element Resolver: semantic lookups ("the card titled X", "the Delete
//! button of X") turned into [`Locator`]s.
//!
//! A card is the container that holds both the task's title and the delete
//! affordance, so toasts or headings repeating a title never count. Titles
//! are matched in tiers, each consulted only if the previous one found
//! nothing:
//!
//! 1. an element inside the container whose text equals the full title
//! 2. an element whose text starts with the title's first `exact_prefix_chars`
//! 3. the container's rendered text contains the first
//!    `containment_prefix_chars`
//!
//! Tiers 2 and 3 skip a card that shows the same title with a different
//! numeric disambiguator; a shared long prefix never makes two tasks alias.

use crate::config::{Conventions, HarnessConfig, TextConfig};
use crate::css::CssSelector;
use crate::dom::{char_prefix, normalize_whitespace, DomNode, NodePath};
use crate::locator::{Locator, LocatorOptions, Selector};
use crate::result::ProbeResult;
use crate::title::{numeric_suffix, TaskRef};
use std::fmt;

/// Which title tier produced a card match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleTier {
    /// Full title equality
    Exact,
    /// Leading characters
    Prefix,
    /// Containment in the card's text
    Contains,
}

/// Query for task card containers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardQuery {
    /// Full title
    pub title: String,
    /// Label of the delete affordance
    pub affordance: String,
    /// Container shape; `None` selects the innermost qualifying element
    pub container: Option<CssSelector>,
    /// Tier 2 prefix length
    pub exact_prefix_chars: usize,
    /// Tier 3 prefix length
    pub containment_prefix_chars: usize,
}

impl CardQuery {
    /// Query with the default prefix lengths and no container shape
    #[must_use]
    pub fn new(title: impl Into<String>, affordance: impl Into<String>) -> Self {
        let text = TextConfig::default();
        Self {
            title: title.into(),
            affordance: affordance.into(),
            container: None,
            exact_prefix_chars: text.exact_prefix_chars,
            containment_prefix_chars: text.containment_prefix_chars,
        }
    }

    /// Restrict containers to a CSS shape
    #[must_use]
    pub fn with_container(mut self, container: CssSelector) -> Self {
        self.container = Some(container);
        self
    }

    /// Paths of matching cards relative to `root`
    #[must_use]
    pub fn find(&self, root: &DomNode) -> Vec<NodePath> {
        self.find_with_tier(root).map(|(_, paths)| paths).unwrap_or_default()
    }

    /// Matching cards and the tier that found them
    #[must_use]
    pub fn find_with_tier(&self, root: &DomNode) -> Option<(TitleTier, Vec<NodePath>)> {
        let candidates = self.candidates(root);
        for tier in [TitleTier::Exact, TitleTier::Prefix, TitleTier::Contains] {
            let matched: Vec<NodePath> = candidates
                .iter()
                .filter(|(_, node)| self.title_matches(node, tier))
                .map(|(path, _)| path.clone())
                .collect();
            let matched = if self.container.is_some() {
                matched
            } else {
                innermost(matched)
            };
            if !matched.is_empty() {
                tracing::debug!(title = %self.title, ?tier, count = matched.len(), "card tier matched");
                return Some((tier, matched));
            }
        }
        None
    }

    /// Elements of the right shape that contain the delete affordance
    fn candidates<'a>(&self, root: &'a DomNode) -> Vec<(NodePath, &'a DomNode)> {
        root.walk()
            .into_iter()
            .skip(1)
            .filter(|n| {
                self.container
                    .as_ref()
                    .map_or(true, |css| css.matches(root, &n.path))
            })
            .filter(|n| has_affordance(n.node, &self.affordance))
            .map(|n| (n.path, n.node))
            .collect()
    }

    fn title_matches(&self, card: &DomNode, tier: TitleTier) -> bool {
        let title = normalize_whitespace(&self.title);
        match tier {
            TitleTier::Exact => card
                .walk()
                .iter()
                .skip(1)
                .any(|n| n.node.text_content() == title),
            TitleTier::Prefix => {
                let prefix = char_prefix(&title, self.exact_prefix_chars);
                card.walk()
                    .iter()
                    .skip(1)
                    .any(|n| n.node.text_content().starts_with(prefix))
                    && !self.shows_other_disambiguator(card, &title)
            }
            TitleTier::Contains => {
                let prefix = char_prefix(&title, self.containment_prefix_chars);
                card.text_content().contains(prefix) && !self.shows_other_disambiguator(card, &title)
            }
        }
    }

    /// Some element of `card` reads as `title`'s base with a different
    /// trailing number
    fn shows_other_disambiguator(&self, card: &DomNode, title: &str) -> bool {
        let Some(own) = numeric_suffix(title) else {
            return false;
        };
        let base = title.strip_suffix(own).unwrap_or(title).trim_end();
        let lead = char_prefix(base, self.containment_prefix_chars);
        card.walk().iter().skip(1).any(|n| {
            let text = n.node.text_content();
            text.starts_with(lead) && numeric_suffix(&text).is_some_and(|other| other != own)
        })
    }
}

/// Whether some element below `node` is labelled `affordance`
fn has_affordance(node: &DomNode, affordance: &str) -> bool {
    node.walk().iter().skip(1).any(|n| {
        !n.node.is_non_rendered() && n.node.text_content().eq_ignore_ascii_case(affordance)
    })
}

fn innermost(paths: Vec<NodePath>) -> Vec<NodePath> {
    paths
        .iter()
        .filter(|p| !paths.iter().any(|other| p.is_ancestor_of(other)))
        .cloned()
        .collect()
}

/// Form controls the harness drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Sign-up username
    Username,
    /// Account email
    Email,
    /// Account password
    Password,
    /// New task title
    Title,
    /// New task description
    Description,
    /// New task due date
    DueDate,
    /// New task priority
    Priority,
    /// Title in the edit modal
    EditTitle,
    /// Description in the edit modal
    EditDescription,
    /// Due date in the edit modal
    EditDueDate,
    /// Priority in the edit modal
    EditPriority,
}

impl Field {
    /// CSS selector of the field under `conventions`
    #[must_use]
    pub fn selector<'c>(&self, conventions: &'c Conventions) -> &'c str {
        let f = &conventions.fields;
        match self {
            Self::Username => &f.username,
            Self::Email => &f.email,
            Self::Password => &f.password,
            Self::Title => &f.title,
            Self::Description => &f.description,
            Self::DueDate => &f.due_date,
            Self::Priority => &f.priority,
            Self::EditTitle => &f.edit_title,
            Self::EditDescription => &f.edit_description,
            Self::EditDueDate => &f.edit_due_date,
            Self::EditPriority => &f.edit_priority,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Username => "username",
            Self::Email => "email",
            Self::Password => "password",
            Self::Title => "title",
            Self::Description => "description",
            Self::DueDate => "due date",
            Self::Priority => "priority",
            Self::EditTitle => "edit title",
            Self::EditDescription => "edit description",
            Self::EditDueDate => "edit due date",
            Self::EditPriority => "edit priority",
        };
        f.write_str(name)
    }
}

/// Buttons rendered inside a task card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardAction {
    /// Completion toggle on an open task
    MarkComplete,
    /// Completion toggle on a completed task
    MarkIncomplete,
    /// Opens the edit modal
    Edit,
    /// Starts deletion
    Delete,
}

impl CardAction {
    /// Button label under `conventions`
    #[must_use]
    pub fn label<'c>(&self, conventions: &'c Conventions) -> &'c str {
        match self {
            Self::MarkComplete => &conventions.mark_complete_label,
            Self::MarkIncomplete => &conventions.mark_incomplete_label,
            Self::Edit => &conventions.edit_label,
            Self::Delete => &conventions.delete_label,
        }
    }
}

/// What to look up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    /// The card of a task
    Card {
        /// Full title
        title: String,
    },
    /// A form control
    Field(Field),
    /// A button inside a task's card
    ActionButton {
        /// Full title
        title: String,
        /// Which button
        action: CardAction,
    },
    /// An element by accessible role and name
    Role {
        /// ARIA role
        role: String,
        /// Accessible name (case-insensitive containment)
        name: Option<String>,
    },
}

impl ElementKind {
    /// Card of `task`
    #[must_use]
    pub fn card(task: &TaskRef) -> Self {
        Self::Card {
            title: task.title().to_string(),
        }
    }

    /// Action button of `task`
    #[must_use]
    pub fn action(task: &TaskRef, action: CardAction) -> Self {
        Self::ActionButton {
            title: task.title().to_string(),
            action,
        }
    }
}

/// Maps [`ElementKind`]s to locators following the application's DOM
/// conventions
#[derive(Debug, Clone)]
pub struct ElementResolver {
    conventions: Conventions,
    text: TextConfig,
    container: Option<CssSelector>,
    options: LocatorOptions,
}

impl ElementResolver {
    /// Create a resolver
    ///
    /// # Errors
    ///
    /// Returns [`crate::ProbeError::InvalidSelector`] when the card container
    /// selector does not parse.
    pub fn new(conventions: Conventions, text: TextConfig, options: LocatorOptions) -> ProbeResult<Self> {
        let container = conventions
            .card_container
            .as_deref()
            .map(CssSelector::parse)
            .transpose()?;
        Ok(Self {
            conventions,
            text,
            container,
            options,
        })
    }

    /// Resolver for action lookups under `config`
    pub fn from_config(config: &HarnessConfig) -> ProbeResult<Self> {
        Self::new(
            config.conventions.clone(),
            config.text.clone(),
            config.timeouts.action_locator(),
        )
    }

    /// Same resolver with different locator options
    #[must_use]
    pub fn with_options(mut self, options: LocatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Conventions in use
    #[must_use]
    pub const fn conventions(&self) -> &Conventions {
        &self.conventions
    }

    /// Parsed card container shape
    #[must_use]
    pub const fn container(&self) -> Option<&CssSelector> {
        self.container.as_ref()
    }

    /// Locator options in use
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Card query for `title`
    #[must_use]
    pub fn card_query(&self, title: &str) -> CardQuery {
        CardQuery {
            title: title.to_string(),
            affordance: self.conventions.delete_label.clone(),
            container: self.container.clone(),
            exact_prefix_chars: self.text.exact_prefix_chars,
            containment_prefix_chars: self.text.containment_prefix_chars,
        }
    }

    /// A fresh locator for `kind`; nothing is resolved until it is used
    #[must_use]
    pub fn locate(&self, kind: &ElementKind) -> Locator {
        let locator = match kind {
            ElementKind::Card { title } => Locator::from_selector(Selector::Card(self.card_query(title))),
            ElementKind::Field(field) => Locator::new(field.selector(&self.conventions)),
            ElementKind::ActionButton { title, action } => {
                let card = self.locate(&ElementKind::Card { title: title.clone() });
                card.locator(Selector::role_exact("button", action.label(&self.conventions)))
            }
            ElementKind::Role { role, name } => {
                Locator::from_selector(Selector::role(role.clone(), name.as_deref()))
            }
        };
        locator.with_options(self.options)
    }

    /// Card of `task`
    #[must_use]
    pub fn card(&self, task: &TaskRef) -> Locator {
        self.locate(&ElementKind::card(task))
    }

    /// Action button of `task`
    #[must_use]
    pub fn action_button(&self, task: &TaskRef, action: CardAction) -> Locator {
        self.locate(&ElementKind::action(task, action))
    }

    /// Form control
    #[must_use]
    pub fn field(&self, field: Field) -> Locator {
        self.locate(&ElementKind::Field(field))
    }

    /// Button by accessible name
    #[must_use]
    pub fn button(&self, name: &str) -> Locator {
        self.locate(&ElementKind::Role {
            role: "button".to_string(),
            name: Some(name.to_string()),
        })
    }

    /// Element by visible text (containment)
    #[must_use]
    pub fn text(&self, text: &str) -> Locator {
        Locator::from_selector(Selector::text(text)).with_options(self.options)
    }

    /// Element by CSS selector
    #[must_use]
    pub fn css(&self, selector: &str) -> Locator {
        Locator::new(selector).with_options(self.options)
    }

    /// Every visible delete control on the page, cards or not
    #[must_use]
    pub fn delete_controls(&self) -> Locator {
        Locator::from_selector(Selector::text_exact(self.conventions.delete_label.clone()))
            .with_options(self.options)
            .with_strict(false)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::dom::DomSnapshot;
    use crate::result::ProbeError;

    const CARD: &str = "p-6 rounded-lg shadow-md";

    fn card(title: &str, description: &str) -> DomNode {
        DomNode::element("div")
            .with_class(CARD)
            .with_child(DomNode::element("h3").with_text(title))
            .with_child(DomNode::element("p").with_text(description))
            .with_child(DomNode::element("button").with_text("Mark Complete"))
            .with_child(DomNode::element("button").with_text("Edit"))
            .with_child(DomNode::element("button").with_text("Delete"))
    }

    fn page(cards: Vec<DomNode>) -> DomNode {
        DomNode::element("body")
            .with_child(DomNode::element("h1").with_text("My Tasks"))
            .with_child(DomNode::element("div").with_id("list").with_children(cards))
    }

    fn resolver(container: Option<&str>) -> ElementResolver {
        let conventions = Conventions {
            card_container: container.map(str::to_string),
            ..Conventions::default()
        };
        ElementResolver::new(conventions, TextConfig::default(), LocatorOptions::default()).unwrap()
    }

    fn default_resolver() -> ElementResolver {
        resolver(Some("div.p-6.rounded-lg.shadow-md"))
    }

    mod tier_tests {
        use super::*;

        #[test]
        fn test_exact_tier() {
            let root = page(vec![card("Buy milk 1", ""), card("Buy milk 12", "")]);
            let query = default_resolver().card_query("Buy milk 1");
            let (tier, paths) = query.find_with_tier(&root).unwrap();
            assert_eq!(tier, TitleTier::Exact);
            assert_eq!(paths, vec![NodePath(vec![1, 0])]);
        }

        #[test]
        fn test_prefix_tier_for_long_titles() {
            let long = "x".repeat(150);
            let rendered = format!("{}…", &long[..120]);
            let root = page(vec![card(&rendered, "")]);
            let (tier, paths) = default_resolver().card_query(&long).find_with_tier(&root).unwrap();
            assert_eq!(tier, TitleTier::Prefix);
            assert_eq!(paths.len(), 1);
        }

        #[test]
        fn test_long_siblings_do_not_alias() {
            let base = "z".repeat(500);
            let first = format!("{base} 1700000000001");
            let second = format!("{base} 1700000000002");
            let root = page(vec![card(&second, "")]);
            let r = default_resolver();
            assert!(r.card_query(&first).find(&root).is_empty());
            assert_eq!(
                r.card_query(&second).find_with_tier(&root).unwrap().0,
                TitleTier::Exact
            );
        }

        #[test]
        fn test_truncated_display_still_matches_by_prefix() {
            let title = format!("{} 1700000000001", "w".repeat(150));
            let rendered = format!("{}…", &title[..120]);
            let root = page(vec![card(&rendered, "")]);
            let (tier, paths) = default_resolver().card_query(&title).find_with_tier(&root).unwrap();
            assert_eq!(tier, TitleTier::Prefix);
            assert_eq!(paths.len(), 1);
        }

        #[test]
        fn test_containment_tier() {
            let title = format!("{} tail", "y".repeat(60));
            let root = DomNode::element("body").with_child(
                DomNode::element("div")
                    .with_class(CARD)
                    .with_text(format!("Title: {}", &title[..55]))
                    .with_child(DomNode::element("button").with_text("Delete")),
            );
            let (tier, _) = default_resolver().card_query(&title).find_with_tier(&root).unwrap();
            assert_eq!(tier, TitleTier::Contains);
        }

        #[test]
        fn test_requires_delete_affordance() {
            let toast = DomNode::element("div")
                .with_class(CARD)
                .with_child(DomNode::element("span").with_text("Buy milk 1"));
            let root = page(vec![toast]);
            assert!(default_resolver().card_query("Buy milk 1").find(&root).is_empty());
        }

        #[test]
        fn test_respects_container_shape() {
            let root = DomNode::element("body").with_child(
                DomNode::element("section")
                    .with_child(DomNode::element("h3").with_text("Buy milk 1"))
                    .with_child(DomNode::element("button").with_text("Delete")),
            );
            assert!(default_resolver().card_query("Buy milk 1").find(&root).is_empty());
            assert_eq!(
                resolver(None).card_query("Buy milk 1").find(&root),
                vec![NodePath(vec![0])]
            );
        }

        #[test]
        fn test_innermost_without_container() {
            let root = page(vec![card("Buy milk 1", ""), card("Other 2", "")]);
            let paths = resolver(None).card_query("Buy milk 1").find(&root);
            assert_eq!(paths, vec![NodePath(vec![1, 0])]);
        }

        #[test]
        fn test_whitespace_in_title_is_normalized() {
            let root = page(vec![card("Buy   milk\n1", "")]);
            assert_eq!(default_resolver().card_query("Buy milk 1").find(&root).len(), 1);
        }
    }

    mod locate_tests {
        use super::*;

        #[test]
        fn test_duplicate_titles_are_ambiguous() {
            let snapshot = DomSnapshot::new("", page(vec![card("Dup 1", ""), card("Dup 1", "")]));
            let locator = default_resolver().card(&TaskRef::from_title("Dup 1"));
            let err = locator.resolve_in(&snapshot).unwrap_err();
            assert!(matches!(err, ProbeError::AmbiguousMatch { count: 2, .. }));
        }

        #[test]
        fn test_action_button_is_card_scoped() {
            let snapshot = DomSnapshot::new(
                "",
                page(vec![card("Alpha 1", ""), card("Beta 2", "")]),
            );
            let r = default_resolver();
            let paths = r
                .action_button(&TaskRef::from_title("Beta 2"), CardAction::Delete)
                .matches(&snapshot)
                .unwrap();
            assert_eq!(paths, vec![NodePath(vec![1, 1, 4])]);
            let edit = r
                .action_button(&TaskRef::from_title("Alpha 1"), CardAction::Edit)
                .matches(&snapshot)
                .unwrap();
            assert_eq!(edit, vec![NodePath(vec![1, 0, 3])]);
        }

        #[test]
        fn test_field_selectors() {
            let r = default_resolver();
            assert_eq!(
                r.field(Field::EditPriority).selector(),
                &Selector::css("select#edit-priority")
            );
            assert_eq!(Field::DueDate.to_string(), "due date");
        }

        #[test]
        fn test_delete_controls_are_lax() {
            let snapshot = DomSnapshot::new("", page(vec![card("A 1", ""), card("B 2", "")]));
            let controls = default_resolver().delete_controls();
            assert_eq!(controls.matches(&snapshot).unwrap().len(), 2);
            assert!(!controls.options().strict);
        }

        #[test]
        fn test_bad_container_selector() {
            let conventions = Conventions {
                card_container: Some("div:hover".to_string()),
                ..Conventions::default()
            };
            assert!(ElementResolver::new(conventions, TextConfig::default(), LocatorOptions::default()).is_err());
        }
    }
}
