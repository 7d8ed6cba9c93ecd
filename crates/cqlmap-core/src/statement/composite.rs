use crate::{
    error::Error,
    statement::{
        BuildCache, PrimitiveStatement, Statement, StatementKind, StatementNode, offset_stages,
    },
};
use std::sync::Arc;

// composite
// Shared body of the two staging composites; only `compile` differs.
macro_rules! composite {
    ($name:ident, $kind:expr) => {
        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self::default()
            }

            pub fn add(&mut self, statement: impl Into<StatementNode>) -> &mut Self {
                self.children.push(statement.into());
                self.cache.invalidate();
                self
            }

            #[must_use]
            pub fn children(&self) -> &[StatementNode] {
                &self.children
            }

            #[must_use]
            pub fn get(&self, index: usize) -> Option<&StatementNode> {
                self.children.get(index)
            }

            /// Mutable access to a child; this composite recompiles.
            pub fn get_mut(&mut self, index: usize) -> Option<&mut StatementNode> {
                self.cache.invalidate();
                self.children.get_mut(index)
            }

            pub fn remove(&mut self, index: usize) -> Option<StatementNode> {
                if index >= self.children.len() {
                    return None;
                }
                self.cache.invalidate();
                Some(self.children.remove(index))
            }

            #[must_use]
            pub fn len(&self) -> usize {
                self.children.len()
            }

            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.children.is_empty()
            }
        }

        impl Statement for $name {
            fn kind(&self) -> StatementKind {
                $kind
            }

            fn build(&mut self) -> Result<Arc<[PrimitiveStatement]>, Error> {
                if !self.children.iter().any(Statement::is_dirty)
                    && let Some(hit) = self.cache.hit(self.kind(), None)
                {
                    return Ok(hit);
                }

                let compiled = self.compile()?;

                Ok(self.cache.store(self.kind(), None, compiled))
            }

            fn is_dirty(&self) -> bool {
                self.cache.is_dirty() || self.children.iter().any(Statement::is_dirty)
            }
        }

        impl<S: Into<StatementNode>> FromIterator<S> for $name {
            fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
                Self {
                    children: iter.into_iter().map(Into::into).collect(),
                    cache: BuildCache::default(),
                }
            }
        }
    };
}

///
/// Sequence
///
/// Children run one after another: each child's stages start after the
/// last stage of the previous child.
///

#[derive(Debug, Default)]
pub struct Sequence {
    children: Vec<StatementNode>,
    cache: BuildCache,
}

impl Sequence {
    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let mut out = Vec::new();
        let mut offset = 0;

        for child in &mut self.children {
            let compiled = child.build()?;
            let Some(last) = compiled.iter().map(|p| p.stage).max() else {
                continue;
            };
            out.extend(offset_stages(&compiled, offset));
            offset += last + 1;
        }

        Ok(out)
    }
}

composite!(Sequence, StatementKind::Sequence);

///
/// Group
///
/// Children run concurrently; their stages are kept as compiled.
///

#[derive(Debug, Default)]
pub struct Group {
    children: Vec<StatementNode>,
    cache: BuildCache,
}

impl Group {
    fn compile(&mut self) -> Result<Vec<PrimitiveStatement>, Error> {
        let mut out = Vec::new();
        for child in &mut self.children {
            out.extend(child.build()?.iter().cloned());
        }

        Ok(out)
    }
}

composite!(Group, StatementKind::Group);
