//! Error types for hierarchy construction, addressing and wiring.
//!
//! Every error is fatal for the operation that raised it and names the modules,
//! ports and directions involved by their hierarchical path.

use knit_netlist::{Direction, NetlistError, SelectError, Shape};

/// Errors in the textual or numeric addressing of a reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// The text does not follow `name([idx])*([hi:lo])?`.
    #[error("malformed reference `{text}`: {reason}")]
    Malformed {
        /// The offending text.
        text: String,
        /// What was wrong.
        reason: &'static str,
    },

    /// More than one `[hi:lo]` range.
    #[error("reference `{text}` has more than one range")]
    MultipleRanges {
        /// The offending text.
        text: String,
    },

    /// An index follows a range.
    #[error("reference `{text}` has an index after a range")]
    SliceBeforeIndex {
        /// The offending text.
        text: String,
    },

    /// Indices or slice do not fit the target's shape.
    #[error("`{target}`: {cause}")]
    Select {
        /// The reference being resolved.
        target: String,
        /// The failed selection.
        #[source]
        cause: SelectError,
    },

    /// Two references that must have the same shape do not.
    #[error("cannot connect {left} ({left_shape}) to {right} ({right_shape})")]
    ShapeMismatch {
        /// First reference.
        left: String,
        /// Shape of the first reference.
        left_shape: Shape,
        /// Second reference.
        right: String,
        /// Shape of the second reference.
        right_shape: Shape,
    },

    /// A shape with more bits than a signal can hold.
    #[error("`{target}` ({shape}) is wider than {max} bits", max = u32::MAX)]
    TooWide {
        /// The port or wire being declared.
        target: String,
        /// Its shape.
        shape: Shape,
    },

    /// A bit range that no single index path and slice can express.
    #[error("{target} cannot be addressed as a single reference")]
    NotAddressable {
        /// Description of the range.
        target: String,
    },
}

/// Errors raised by the hierarchy, bundle bookkeeping, and the resolver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierError {
    // --- Structural ---
    /// Two modules to be connected live in different trees.
    #[error("modules `{first}` and `{second}` share no common ancestor")]
    NoCommonAncestor {
        /// First module.
        first: String,
        /// Second module.
        second: String,
    },

    /// A module named as an ancestor is not above the given module.
    #[error("module `{ancestor}` is not an ancestor of `{module}`")]
    NotAncestor {
        /// The module being exported from.
        module: String,
        /// The module that was expected above it.
        ancestor: String,
    },

    /// A mutation was attempted on a frozen module.
    #[error("module `{module}` is frozen; no further structural changes are allowed")]
    Frozen {
        /// The frozen module.
        module: String,
    },

    /// A module was added as a child while already having a parent.
    #[error("module `{child}` already has parent `{parent}`")]
    AlreadyParented {
        /// The module being added.
        child: String,
        /// Its existing parent.
        parent: String,
    },

    /// Adding a child would make a module its own ancestor.
    #[error("adding `{child}` under `{parent}` would create a cycle")]
    HierarchyCycle {
        /// The intended parent.
        parent: String,
        /// The intended child.
        child: String,
    },

    /// An exact name was requested but is already taken.
    #[error("name `{name}` is already used in module `{module}`")]
    DuplicateName {
        /// The module owning the namespace.
        module: String,
        /// The requested name.
        name: String,
    },

    /// A port name that does not exist on the module.
    #[error("module `{module}` has no port `{port}`")]
    UnknownPort {
        /// The module searched.
        module: String,
        /// The missing port.
        port: String,
    },

    /// A bundle name that does not exist on the module.
    #[error("module `{module}` has no bundle `{bundle}`")]
    UnknownBundle {
        /// The module searched.
        module: String,
        /// The missing bundle.
        bundle: String,
    },

    /// A logical port name that the bundle definition does not declare.
    #[error("bundle definition `{def}` has no port `{port}`")]
    UnknownLogicalPort {
        /// The definition searched.
        def: String,
        /// The missing logical port.
        port: String,
    },

    // --- Directionality ---
    /// A lateral connection whose endpoints do not run output to input.
    #[error(
        "illegal feed-through from {driver} ({driver_dir}) to {receiver} ({receiver_dir}): \
         connections between unrelated modules must run from an output to an input"
    )]
    FeedThrough {
        /// The driving reference.
        driver: String,
        /// Its direction.
        driver_dir: Direction,
        /// The receiving reference.
        receiver: String,
        /// Its direction.
        receiver_dir: Direction,
    },

    /// A connection between an ancestor and a descendant that flips direction.
    #[error(
        "vertical connection from {driver} ({driver_dir}) to {receiver} ({receiver_dir}) \
         must preserve direction across the module boundary"
    )]
    VerticalDirection {
        /// The driving reference.
        driver: String,
        /// Its direction.
        driver_dir: Direction,
        /// The receiving reference.
        receiver: String,
        /// Its direction.
        receiver_dir: Direction,
    },

    /// A loop-back inside one module whose receiver is not an output.
    #[error("{receiver} ({receiver_dir}) cannot be driven from inside module `{module}`")]
    IllegalReceiver {
        /// The receiving reference.
        receiver: String,
        /// Its direction.
        receiver_dir: Direction,
        /// The module both endpoints live on.
        module: String,
    },

    // --- Mapping ---
    /// A composite-field name that the port does not declare.
    #[error("port {port} has no field `{field}`")]
    UnmappedField {
        /// The port searched.
        port: String,
        /// The missing field.
        field: String,
    },

    /// A port map added after the bundle's internal instance was wired.
    #[error("bundle `{bundle}` is already connected internally; cannot map {physical}")]
    AliasesInternal {
        /// The bundle.
        bundle: String,
        /// The physical reference being mapped.
        physical: String,
    },

    /// The same physical/logical pair mapped twice.
    #[error("{physical} is already mapped to {logical} in bundle `{bundle}`")]
    DuplicatePortMap {
        /// The bundle.
        bundle: String,
        /// The physical reference.
        physical: String,
        /// The logical reference.
        logical: String,
    },

    /// A physical port whose direction does not match the logical port's role.
    #[error("cannot map {physical} ({physical_dir}) onto {logical} ({logical_dir})")]
    MapDirection {
        /// The physical reference.
        physical: String,
        /// Its direction.
        physical_dir: Direction,
        /// The logical reference.
        logical: String,
        /// The direction the bundle role requires.
        logical_dir: Direction,
    },

    /// A port map whose two sides are on different modules.
    #[error("{physical} does not belong to module `{module}` of bundle `{bundle}`")]
    MapModule {
        /// The physical reference.
        physical: String,
        /// The bundle's module.
        module: String,
        /// The bundle.
        bundle: String,
    },

    /// A bundle reference with no physical port behind it.
    #[error("{logical} is not mapped to a physical port")]
    UnmappedBundlePort {
        /// The logical reference.
        logical: String,
    },

    /// Bundles with unmapped, non-excluded logical ports.
    #[error(
        "incomplete bundle connection: `{first}` is missing [{}], `{second}` is missing [{}]",
        .first_missing.join(", "),
        .second_missing.join(", ")
    )]
    IncompleteBundles {
        /// First bundle.
        first: String,
        /// Its unmapped logical ports.
        first_missing: Vec<String>,
        /// Second bundle.
        second: String,
        /// Its unmapped logical ports.
        second_missing: Vec<String>,
    },

    /// Roles that do not fit the relative position of two bundles.
    #[error(
        "{kind} bundle connection between `{first}` ({first_role}) and `{second}` \
         ({second_role}) requires {expected} roles"
    )]
    RoleMismatch {
        /// `"horizontal"` or `"vertical"`.
        kind: &'static str,
        /// First bundle.
        first: String,
        /// Its role.
        first_role: crate::bundle::Role,
        /// Second bundle.
        second: String,
        /// Its role.
        second_role: crate::bundle::Role,
        /// `"different"` or `"equal"`.
        expected: &'static str,
    },

    /// Bundles built from different definitions.
    #[error("bundles `{first}` ({first_def}) and `{second}` ({second_def}) use different definitions")]
    BundleDefMismatch {
        /// First bundle.
        first: String,
        /// Its definition.
        first_def: String,
        /// Second bundle.
        second: String,
        /// Its definition.
        second_def: String,
    },

    /// Two bundles on one module.
    #[error("bundles `{first}` and `{second}` are both on module `{module}`")]
    BundleLoopback {
        /// First bundle.
        first: String,
        /// Second bundle.
        second: String,
        /// The shared module.
        module: String,
    },

    // --- Addressing ---
    /// An addressing failure.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// A failure in the underlying signal graph.
    #[error(transparent)]
    Netlist(#[from] NetlistError),
}
