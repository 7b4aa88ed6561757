//! Composable pure accessors into nested documents
//!
//! An optic describes a path into a document value, independent of any store.
//! Two variants exist:
//!
//! - [`Lens`]: a total path `A -> B`. Laws: `get(set(a, b)) == b` and
//!   `set(a, get(a)) == a`.
//! - [`Prism`]: a partial path `A -> Option<B>`, gated by a discriminator on
//!   `A` (typically an enum variant). Law: if `get(a)` is `None` then
//!   `set(a, b) == a` for every `b` — a mismatched write is a no-op.
//!
//! Optics compose associatively via explicit function composition
//! ([`Lens::then`], [`Prism::then`], and the mixed forms). Composing a prism
//! anywhere into a chain makes the whole chain partial: writes through a
//! composed optic whose intermediate guard no longer matches the live
//! document are dropped without touching structurally unrelated fields.
//!
//! Accessors are stored as `Arc`'d closures, so optics are cheap to clone
//! and safe to share across tasks.

use std::sync::Arc;

/// A total, law-abiding accessor `A -> B`.
pub struct Lens<A, B> {
    get: Arc<dyn Fn(&A) -> B + Send + Sync>,
    set: Arc<dyn Fn(&A, B) -> A + Send + Sync>,
}

impl<A, B> Clone for Lens<A, B> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<A, B> Lens<A, B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    /// Build a lens from a getter/setter pair.
    ///
    /// The pair must satisfy the lens laws: `get(set(a, b)) == b` and
    /// `set(a, get(a)) == a`.
    pub fn new(
        get: impl Fn(&A) -> B + Send + Sync + 'static,
        set: impl Fn(&A, B) -> A + Send + Sync + 'static,
    ) -> Self {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    /// Read the focused value.
    pub fn get(&self, a: &A) -> B {
        (self.get)(a)
    }

    /// Write the focused value, returning the updated whole.
    pub fn set(&self, a: &A, b: B) -> A {
        (self.set)(a, b)
    }

    /// Compose with a deeper lens, keeping the path total.
    pub fn then<C>(&self, next: Lens<B, C>) -> Lens<A, C>
    where
        C: Clone + Send + Sync + 'static,
    {
        let g_outer = Arc::clone(&self.get);
        let g2 = Arc::clone(&self.get);
        let s_outer = Arc::clone(&self.set);
        let inner_get = next.clone();
        let inner = next;
        Lens {
            get: Arc::new(move |a| inner_get.get(&(g_outer)(a))),
            set: Arc::new(move |a, c| {
                let b = (g2)(a);
                (s_outer)(a, inner.set(&b, c))
            }),
        }
    }

    /// Compose with a deeper prism; the whole path becomes partial.
    pub fn then_prism<C>(&self, next: Prism<B, C>) -> Prism<A, C>
    where
        C: Clone + Send + Sync + 'static,
    {
        let g_outer = Arc::clone(&self.get);
        let g2 = Arc::clone(&self.get);
        let s_outer = Arc::clone(&self.set);
        let inner_get = next.clone();
        let inner = next;
        Prism {
            get: Arc::new(move |a| inner_get.get(&(g_outer)(a))),
            set: Arc::new(move |a, c| {
                let b = (g2)(a);
                if inner.get(&b).is_some() {
                    (s_outer)(a, inner.set(&b, c))
                } else {
                    a.clone()
                }
            }),
        }
    }

    /// Narrow this lens to a prism gated by a predicate over the whole.
    ///
    /// When the predicate does not hold, reads yield `None` and writes are
    /// no-ops.
    pub fn guard(&self, pred: impl Fn(&A) -> bool + Send + Sync + 'static) -> Prism<A, B> {
        let pred = Arc::new(pred);
        let pred_get = Arc::clone(&pred);
        let g = Arc::clone(&self.get);
        let s = Arc::clone(&self.set);
        Prism {
            get: Arc::new(move |a| if pred_get(a) { Some((g)(a)) } else { None }),
            set: Arc::new(move |a, b| if pred(a) { (s)(a, b) } else { a.clone() }),
        }
    }
}

impl<A, B> Lens<A, Option<B>>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    /// Focus the value inside an optional leaf.
    ///
    /// The resulting prism reads `None` while the leaf is absent and, per
    /// the prism no-op law, drops writes issued against an absent leaf.
    /// To initialize an absent leaf, bind the plain `Lens<A, Option<B>>`
    /// and set `Some(..)` through it.
    pub fn optional(&self) -> Prism<A, B> {
        let g = Arc::clone(&self.get);
        let g2 = Arc::clone(&self.get);
        let s = Arc::clone(&self.set);
        Prism {
            get: Arc::new(move |a| (g)(a)),
            set: Arc::new(move |a, b| {
                if (g2)(a).is_some() {
                    (s)(a, Some(b))
                } else {
                    a.clone()
                }
            }),
        }
    }
}

/// A partial accessor `A -> Option<B>` gated by a discriminator on `A`.
pub struct Prism<A, B> {
    get: Arc<dyn Fn(&A) -> Option<B> + Send + Sync>,
    set: Arc<dyn Fn(&A, B) -> A + Send + Sync>,
}

impl<A, B> Clone for Prism<A, B> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            set: Arc::clone(&self.set),
        }
    }
}

impl<A, B> Prism<A, B>
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
{
    /// Build a prism from a partial getter and a guarded setter.
    ///
    /// The setter must return `a` unchanged whenever the getter would yield
    /// `None` for `a` (the prism no-op law).
    pub fn new(
        get: impl Fn(&A) -> Option<B> + Send + Sync + 'static,
        set: impl Fn(&A, B) -> A + Send + Sync + 'static,
    ) -> Self {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    /// Widen a total lens into a prism that always matches.
    pub fn from_lens(lens: Lens<A, B>) -> Self {
        let g = Arc::clone(&lens.get);
        let s = Arc::clone(&lens.set);
        Self {
            get: Arc::new(move |a| Some((g)(a))),
            set: Arc::new(move |a, b| (s)(a, b)),
        }
    }

    /// Read the focused value, if the guard matches.
    pub fn get(&self, a: &A) -> Option<B> {
        (self.get)(a)
    }

    /// Write the focused value; a no-op when the guard does not match.
    pub fn set(&self, a: &A, b: B) -> A {
        (self.set)(a, b)
    }

    /// Compose with a deeper lens; partiality is unchanged.
    pub fn then_lens<C>(&self, next: Lens<B, C>) -> Prism<A, C>
    where
        C: Clone + Send + Sync + 'static,
    {
        let g_outer = Arc::clone(&self.get);
        let g2 = Arc::clone(&self.get);
        let s_outer = Arc::clone(&self.set);
        let inner_get = next.clone();
        let inner = next;
        Prism {
            get: Arc::new(move |a| (g_outer)(a).map(|b| inner_get.get(&b))),
            set: Arc::new(move |a, c| match (g2)(a) {
                Some(b) => (s_outer)(a, inner.set(&b, c)),
                None => a.clone(),
            }),
        }
    }

    /// Compose with a deeper prism; both guards must match for the path to
    /// read or write.
    pub fn then<C>(&self, next: Prism<B, C>) -> Prism<A, C>
    where
        C: Clone + Send + Sync + 'static,
    {
        let g_outer = Arc::clone(&self.get);
        let g2 = Arc::clone(&self.get);
        let s_outer = Arc::clone(&self.set);
        let inner_get = next.clone();
        let inner = next;
        Prism {
            get: Arc::new(move |a| (g_outer)(a).and_then(|b| inner_get.get(&b))),
            set: Arc::new(move |a, c| match (g2)(a) {
                Some(b) => {
                    if inner.get(&b).is_some() {
                        (s_outer)(a, inner.set(&b, c))
                    } else {
                        a.clone()
                    }
                }
                None => a.clone(),
            }),
        }
    }
}
