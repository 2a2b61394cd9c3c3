//! Semantic URL path codec.
//!
//! The storefront addresses every view with a human-readable path instead of
//! query strings: `/Performance/jersey-01/Home-Blue` is the product page for
//! `jersey-01` in the Home-Blue colorway, `/catalogue/gender/womens` a
//! filtered catalogue, `/Performance` a collection-scoped catalogue.
//!
//! [`encode`] and [`decode`] are pure functions over the path string and the
//! set of known collection groups, so shareable links round-trip without
//! consulting any global state. Decoding is total: every input string maps
//! to some valid view state, and anything unrecognized collapses to the
//! landing page.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Path segment used for product paths whose catalog entry has no known
/// collection group. Decoding such a path degrades to the catalogue view.
pub const FALLBACK_GROUP_SEGMENT: &str = "catalogue";

/// Static views the storefront can render. Closed set; each non-home view
/// owns one canonical path segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    Catalogue,
    About,
    Contact,
    Faq,
    Checkout,
}

impl View {
    pub fn segment(self) -> &'static str {
        match self {
            Self::Home => "",
            Self::Catalogue => "catalogue",
            Self::About => "about",
            Self::Contact => "contact",
            Self::Faq => "faq",
            Self::Checkout => "checkout",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "catalogue" => Some(Self::Catalogue),
            "about" => Some(Self::About),
            "contact" => Some(Self::Contact),
            "faq" => Some(Self::Faq),
            "checkout" => Some(Self::Checkout),
            _ => None,
        }
    }
}

/// Catalogue filter dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Group,
    Category,
    Gender,
}

impl FilterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Category => "category",
            Self::Gender => "gender",
        }
    }

    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "group" => Some(Self::Group),
            "category" => Some(Self::Category),
            "gender" => Some(Self::Gender),
            _ => None,
        }
    }
}

/// Decoded view state. A path encodes either a catalogue filter or a
/// product detail, never both, which the variant split makes unrepresentable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouteState {
    View { view: View },
    CatalogueFilter { filter: FilterKind, value: String },
    CatalogueGroup { group: String },
    Product { group: Option<String>, product_id: String, color: Option<String> },
}

impl RouteState {
    pub fn home() -> Self {
        Self::View { view: View::Home }
    }
}

/// True for segments the router reserves for static views and the catalogue
/// prefix. A collection group with a colliding slug would shadow the view,
/// so data entry should reject such names.
pub fn is_reserved_segment(segment: &str) -> bool {
    View::from_segment(segment).is_some()
}

/// Encode a view state as a browser-visible path. Every emitted segment is
/// percent-encoded.
///
/// A product whose group is absent or not in `known_groups` encodes under
/// [`FALLBACK_GROUP_SEGMENT`]; decoding such a path degrades to the
/// catalogue view rather than the product.
pub fn encode(state: &RouteState, known_groups: &[String]) -> String {
    match state {
        RouteState::View { view: View::Home } => "/".to_string(),
        RouteState::View { view } => format!("/{}", view.segment()),
        RouteState::CatalogueFilter { filter, value } => {
            format!("/catalogue/{}/{}", filter.as_str(), urlencoding::encode(value))
        }
        RouteState::CatalogueGroup { group } => format!("/{}", urlencoding::encode(group)),
        RouteState::Product { group, product_id, color } => {
            let group = group
                .as_deref()
                .filter(|g| known_groups.iter().any(|k| k == g))
                .map_or_else(|| Cow::Borrowed(FALLBACK_GROUP_SEGMENT), urlencoding::encode);
            let mut path = format!("/{}/{}", group, urlencoding::encode(product_id));
            if let Some(color) = color {
                path.push('/');
                path.push_str(&urlencoding::encode(color));
            }
            path
        }
    }
}

/// Decode a path into a view state. Total over all string inputs; malformed
/// or unknown paths resolve to [`View::Home`] rather than erroring.
///
/// Collection-group matching takes precedence over static view names, so a
/// group whose slug collides with a reserved segment shadows that view (see
/// [`is_reserved_segment`]).
pub fn decode(path: &str, known_groups: &[String]) -> RouteState {
    let segments: Vec<String> = path
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(decode_segment)
        .collect();

    let Some(first) = segments.first() else {
        return RouteState::home();
    };

    if known_groups.iter().any(|g| g == first) {
        return if segments.len() == 1 {
            RouteState::CatalogueGroup { group: first.clone() }
        } else {
            RouteState::Product {
                group: Some(first.clone()),
                product_id: segments[1].clone(),
                color: segments.get(2).cloned(),
            }
        };
    }

    if first == View::Catalogue.segment() && segments.len() >= 3 {
        return match FilterKind::parse(&segments[1]) {
            Some(filter) => RouteState::CatalogueFilter { filter, value: segments[2].clone() },
            None => RouteState::home(),
        };
    }

    match View::from_segment(first) {
        Some(view) => RouteState::View { view },
        None => RouteState::home(),
    }
}

fn decode_segment(segment: &str) -> String {
    // Invalid percent sequences are kept verbatim; decode must never fail.
    urlencoding::decode(segment).map_or_else(|_| segment.to_string(), Cow::into_owned)
}
