use crate::entity::EntityId;
use crate::layer::LayerId;

/// Errors returned by world and registry operations. A failed operation leaves entity, layer,
/// and system state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EcsError {
    #[error("entity {entity} already has a `{component}` component")]
    DuplicateComponent {
        entity: EntityId,
        component: &'static str,
    },

    #[error("entity {entity} has no `{component}` component")]
    MissingComponent {
        entity: EntityId,
        component: &'static str,
    },

    #[error("no system registered as `{0}`")]
    UnknownSystemType(String),

    #[error("a system for `{0}` components is already registered")]
    DuplicateSystem(&'static str),

    #[error("entity {0} does not exist")]
    DeadEntity(EntityId),

    #[error("layer {0} does not exist")]
    UnknownLayer(LayerId),
}

pub type EcsResult<T> = Result<T, EcsError>;
