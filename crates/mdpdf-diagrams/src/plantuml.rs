//! PlantUML source preparation.

/// Wrap a bare diagram body in `@startuml`/`@enduml`.
///
/// Sources already opening with an `@start...` directive (`@startuml`,
/// `@startmindmap`, ...) are returned trimmed but otherwise unchanged.
#[must_use]
pub fn prepare_source(source: &str) -> String {
    let trimmed = source.trim();
    if trimmed.starts_with("@start") {
        trimmed.to_owned()
    } else {
        format!("@startuml\n{trimmed}\n@enduml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wraps_bare_body() {
        assert_eq!(prepare_source("A -> B\n"), "@startuml\nA -> B\n@enduml");
    }

    #[test]
    fn test_keeps_explicit_start() {
        let source = "@startuml\nA -> B\n@enduml";
        assert_eq!(prepare_source(source), source);
    }

    #[test]
    fn test_keeps_other_start_directives() {
        let source = "  @startmindmap\n* root\n@endmindmap\n";
        assert_eq!(prepare_source(source), "@startmindmap\n* root\n@endmindmap");
    }
}
