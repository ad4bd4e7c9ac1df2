//! Domain constants shared across the front end.

/// Default extension of model source files (without the leading dot).
pub const MODEL_EXTENSION: &str = "cm";

/// Default file name of a package manifest.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Separator between the segments of local and global identifiers.
pub const ID_SEPARATOR: char = '.';

/// Separator between a feature name and an index in synthetic ids.
pub const SYNTHETIC_ID_SEPARATOR: char = '@';

/// Root keywords and the aliases accepted for them.
pub const ENTITY_KEYWORD: &str = "entity";
pub const RELATIONSHIP_KEYWORD: &str = "relationship";
pub const SYSTEM_DIAGRAM_KEYWORD: &str = "systemDiagram";
pub const DIAGRAM_KEYWORD: &str = "diagram";
pub const MAPPING_KEYWORD: &str = "mapping";

/// Property holding an element's declared local id.
pub const ID_PROPERTY: &str = "id";

/// Identifier appended at the cursor so an empty or partial reference still
/// parses to a reference site during completion.
pub const COMPLETION_MARKER: &str = "__tessera_completion";
