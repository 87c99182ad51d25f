//! Navigation model for the tabshell reference site.
//!
//! This crate holds the pure, I/O-free half of tab navigation:
//!
//! - [`TabId`]: the closed set of content panels
//! - [`LanguageId`]: validated language code carried in the URL path
//! - [`NavigationState`]: the committed `{tab, language, hash}` triple
//! - [`TransitionRequest`]: a single navigation intent
//! - [`Location`] and [`RouteCodec`]: mapping between browser locations and
//!   navigation state in both directions
//!
//! # URL Shape
//!
//! ```text
//! /{base_path}/{language}/#{tab}/{anchor}
//!  └─ prefix ─┘ └─ path ─┘  └─ hash ─────┘
//! ```
//!
//! A deployment segment (`build/` by default) anywhere after the base path is
//! ignored on decode, so the same state is recovered whether the site is served
//! from its source tree or its build output.
//!
//! # Example
//!
//! ```
//! use tabshell_nav::{Location, RouteCodec, TabId};
//!
//! let codec = RouteCodec::default();
//! let state = codec.decode(&Location::parse("/de/#maps/berlin"));
//! assert_eq!(state.tab, TabId::Maps);
//! assert_eq!(state.language.as_str(), "de");
//! assert_eq!(codec.encode(&state).to_string(), "/de/#maps/berlin");
//! ```

mod codec;
mod language;
mod location;
mod state;
mod tab;

pub use codec::{RouteCodec, RouteDecodeError};
pub use language::{LanguageError, LanguageId};
pub use location::Location;
pub use state::{NavigationState, TransitionOrigin, TransitionRequest};
pub use tab::{TabId, UnknownTab};
