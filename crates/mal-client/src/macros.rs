//! Crate-internal macros.

/// A lazily compiled, process-wide CSS selector.
macro_rules! selector {
    ($e: expr) => {{
        use ::once_cell::sync::Lazy;
        use ::scraper::Selector;
        static SELECTOR: Lazy<Selector> =
            Lazy::new(|| Selector::parse($e).expect("selector literal must be valid"));
        &*SELECTOR
    }};
}

/// A lazily compiled, process-wide regular expression.
macro_rules! regex {
    ($e: expr) => {{
        use ::once_cell::sync::Lazy;
        use ::regex::Regex;
        static PATTERN: Lazy<Regex> =
            Lazy::new(|| Regex::new($e).expect("regex literal must be valid"));
        &*PATTERN
    }};
}

/// Declares an attribute record and its dispatch table.
///
/// Every field becomes an `Option<T>` slot (None = unset). The generated
/// attribute enum maps each slot to the [`Page`](crate::resource::Page) whose
/// fetch routine populates it.
macro_rules! attributes {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident : $attr:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $ty:ty => $variant:ident @ $page:ident
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                pub $field: Option<$ty>,
            )*
        }

        #[doc = concat!("Attributes of [`", stringify!($name), "`].")]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $attr {
            $( $variant, )*
        }

        impl $crate::attributes::Attributes for $name {
            type Attribute = $attr;

            fn page(attribute: $attr) -> $crate::resource::Page {
                match attribute {
                    $( $attr::$variant => $crate::resource::Page::$page, )*
                }
            }

            fn merge(&mut self, other: Self) {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field;
                    }
                )*
            }

            fn fill(&mut self, other: Self) {
                $(
                    if self.$field.is_none() {
                        self.$field = other.$field;
                    }
                )*
            }
        }
    };
}

/// Async attribute accessors over [`Resource::get`](crate::resource::Resource).
///
/// Each entry names the getter, its value type, the attribute descriptor and
/// the slot it reads.
macro_rules! getters {
    (
        $(
            $(#[$meta:meta])*
            $name:ident : $ty:ty => $attr:expr, |$a:ident| $slot:expr;
        )*
    ) => {
        $(
            $(#[$meta])*
            pub async fn $name(&self) -> $crate::error::Result<Option<$ty>> {
                self.get($attr, |$a| $slot.as_ref()).await
            }
        )*
    };
}

/// Like `getters!`, for slots holding [`Link`](crate::link::Link)s. Each
/// entry names the resolved value type the getter returns.
macro_rules! linked_getters {
    (
        $(
            $(#[$meta:meta])*
            $name:ident : $ty:ty => $attr:expr, |$a:ident| $slot:expr;
        )*
    ) => {
        $(
            $(#[$meta])*
            pub async fn $name(&self) -> $crate::error::Result<Option<$ty>> {
                self.get_linked($attr, |$a| $slot.as_ref()).await
            }
        )*
    };
}
