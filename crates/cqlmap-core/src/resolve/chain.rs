use crate::{
    declare::{ClassDeclaration, FieldDecl},
    error::ConfigurationError,
    model::Lineage,
};
use std::any::TypeId;

///
/// Chain
///
/// A declaration together with the declarations of every ancestor it
/// extends, ancestors first.
///

pub(crate) struct Chain {
    members: Vec<ClassDeclaration>,
    lineage: Lineage,
}

impl Chain {
    pub(crate) fn load(decl: ClassDeclaration) -> Result<Self, ConfigurationError> {
        let class = decl.type_name;
        let mut members: Vec<ClassDeclaration> = Vec::new();
        let mut lineage = Lineage::default();
        let mut next = Some(decl);

        while let Some(decl) = next.take() {
            if members.iter().any(|m| m.type_id == decl.type_id) {
                return Err(ConfigurationError::hierarchy(
                    class,
                    format!("extends chain loops back to '{}'", decl.type_name),
                ));
            }

            if let Some(parent) = &decl.parent {
                lineage.link(
                    decl.type_id,
                    parent.parent.type_id(),
                    parent.projection.clone(),
                );
                next = Some(parent.parent.declaration());
            }
            members.push(decl);
        }
        members.reverse();

        Ok(Self { members, lineage })
    }

    /// The declaration the chain was loaded for.
    pub(crate) fn this(&self) -> &ClassDeclaration {
        // load always pushes at least one member
        &self.members[self.members.len() - 1]
    }

    pub(crate) fn contains(&self, id: TypeId) -> bool {
        self.members.iter().any(|m| m.type_id == id)
    }

    /// Members from `id` down to the chain's own type.
    pub(crate) fn members_from(&self, id: TypeId) -> &[ClassDeclaration] {
        let start = self
            .members
            .iter()
            .position(|m| m.type_id == id)
            .unwrap_or(self.members.len());

        &self.members[start..]
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().flat_map(|m| m.fields.iter())
    }

    /// Fields declared strictly below `id` in the chain.
    pub(crate) fn fields_below(&self, id: TypeId) -> impl Iterator<Item = &FieldDecl> {
        self.members_from(id)
            .iter()
            .skip(1)
            .flat_map(|m| m.fields.iter())
    }

    pub(crate) const fn lineage(&self) -> &Lineage {
        &self.lineage
    }
}
