//! Header-driven column layout, resolved once per pass.

use std::collections::HashMap;

use crate::config::ReconConfig;
use crate::error::SchemaError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<String>,
    positions: HashMap<String, usize>,
    identity: Vec<usize>,
    volatile: Vec<usize>,
    status: usize,
    timestamp: Option<usize>,
    terminal_stamp: Option<usize>,
    missing_optional: Vec<String>,
}

impl ColumnLayout {
    /// Resolve `header` against `config`.
    ///
    /// Identity fields and the status field are required. Volatile and stamp
    /// columns are optional: an absent volatile field is not compared and an
    /// absent stamp column is not written.
    pub fn resolve(header: &[String], config: &ReconConfig) -> Result<Self, SchemaError> {
        // Sheets drop trailing blank cells, other stores pad them.
        let width = header
            .iter()
            .rposition(|h| !h.is_empty())
            .map(|i| i + 1)
            .ok_or(SchemaError::EmptyHeader)?;
        let columns: Vec<String> = header[..width].to_vec();

        let mut positions = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            if name.is_empty() {
                continue;
            }
            if positions.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateColumn {
                    column: name.clone(),
                });
            }
        }

        let require = |field: &str, role: &'static str| {
            positions
                .get(field)
                .copied()
                .ok_or_else(|| SchemaError::MissingColumn {
                    field: field.to_string(),
                    role,
                })
        };

        let identity = config
            .identity
            .iter()
            .map(|f| require(f, "identity"))
            .collect::<Result<Vec<_>, _>>()?;
        let status = require(&config.status_field, "status")?;

        let mut missing_optional = Vec::new();
        let mut volatile = Vec::with_capacity(config.volatile.len());
        for field in &config.volatile {
            match positions.get(field) {
                Some(&pos) => {
                    if !volatile.contains(&pos) {
                        volatile.push(pos);
                    }
                }
                None => missing_optional.push(field.clone()),
            }
        }

        let mut optional = |field: &Option<String>| -> Option<usize> {
            let name = field.as_ref()?;
            let pos = positions.get(name).copied();
            if pos.is_none() {
                missing_optional.push(name.clone());
            }
            pos
        };
        let timestamp = optional(&config.timestamp_field);
        let terminal_stamp = optional(&config.terminal_stamp_field);

        for name in &missing_optional {
            tracing::warn!(column = %name, "configured column not in header; skipping");
        }

        Ok(Self {
            columns,
            positions,
            identity,
            volatile,
            status,
            timestamp,
            terminal_stamp,
            missing_optional,
        })
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn name(&self, position: usize) -> &str {
        self.columns.get(position).map(String::as_str).unwrap_or("")
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn identity(&self) -> &[usize] {
        &self.identity
    }

    pub fn volatile(&self) -> &[usize] {
        &self.volatile
    }

    pub fn status(&self) -> usize {
        self.status
    }

    pub fn timestamp(&self) -> Option<usize> {
        self.timestamp
    }

    pub fn terminal_stamp(&self) -> Option<usize> {
        self.terminal_stamp
    }

    /// Configured optional columns the header does not have.
    pub fn missing_optional(&self) -> &[String] {
        &self.missing_optional
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReconConfig {
        ReconConfig::from_toml(
            r#"
name = "productos"
identity = ["Codigo", "Producto"]
volatile = ["Estado", "Verificado", "Estado proveedor"]
status_field = "Estado"
terminal_status = "entregado"
timestamp_field = "Ultima actualizacion"
terminal_stamp_field = "Fecha recibido"
"#,
        )
        .unwrap()
    }

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_positions() {
        let layout = ColumnLayout::resolve(
            &header(&[
                "Fecha venta",
                "Codigo",
                "Producto",
                "Estado",
                "Verificado",
                "Ultima actualizacion",
            ]),
            &config(),
        )
        .unwrap();

        assert_eq!(layout.width(), 6);
        assert_eq!(layout.identity(), &[1, 2]);
        assert_eq!(layout.status(), 3);
        assert_eq!(layout.volatile(), &[3, 4]);
        assert_eq!(layout.timestamp(), Some(5));
        assert_eq!(layout.terminal_stamp(), None);
        assert_eq!(
            layout.missing_optional(),
            &["Estado proveedor".to_string(), "Fecha recibido".to_string()]
        );
        assert_eq!(layout.name(2), "Producto");
        assert_eq!(layout.position("Verificado"), Some(4));
    }

    #[test]
    fn missing_timestamp_is_not_fatal() {
        let layout =
            ColumnLayout::resolve(&header(&["Codigo", "Producto", "Estado"]), &config()).unwrap();
        assert_eq!(layout.timestamp(), None);
        assert!(layout.missing_optional().contains(&"Ultima actualizacion".to_string()));
    }

    #[test]
    fn missing_identity_is_fatal() {
        let err = ColumnLayout::resolve(&header(&["Codigo", "Estado"]), &config()).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingColumn {
                field: "Producto".into(),
                role: "identity"
            }
        );
    }

    #[test]
    fn missing_status_is_fatal() {
        let err =
            ColumnLayout::resolve(&header(&["Codigo", "Producto", "Verificado"]), &config())
                .unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { role: "status", .. }));
    }

    #[test]
    fn empty_header_is_fatal() {
        assert_eq!(
            ColumnLayout::resolve(&[], &config()).unwrap_err(),
            SchemaError::EmptyHeader
        );
        assert_eq!(
            ColumnLayout::resolve(&header(&["", ""]), &config()).unwrap_err(),
            SchemaError::EmptyHeader
        );
    }

    #[test]
    fn duplicate_names_rejected() {
        let err = ColumnLayout::resolve(
            &header(&["Codigo", "Producto", "Estado", "Codigo"]),
            &config(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateColumn {
                column: "Codigo".into()
            }
        );
    }

    #[test]
    fn blank_header_cells_allowed() {
        let layout = ColumnLayout::resolve(
            &header(&["Codigo", "", "Producto", "", "Estado", "", ""]),
            &config(),
        )
        .unwrap();
        // Trailing blanks trimmed, interior blanks kept positionally.
        assert_eq!(layout.width(), 5);
        assert_eq!(layout.status(), 4);
        assert_eq!(layout.position(""), None);
    }
}
