//! Filial → cidade de origem.

use std::collections::HashMap;

use crate::geo::normalize::normalize_text;
use crate::types::config::OriginConfig;
use crate::types::shipment::Place;

/// Filiais conhecidas de fábrica.
const KNOWN_BRANCHES: &[(&str, &str, &str)] = &[
    ("MATRIZ", "São Paulo", "SP"),
    ("CAJAMAR", "Cajamar", "SP"),
    ("CAMPINAS", "Campinas", "SP"),
    ("GUARULHOS", "Guarulhos", "SP"),
    ("RIBEIRAO PRETO", "Ribeirão Preto", "SP"),
    ("RIO DE JANEIRO", "Rio de Janeiro", "RJ"),
    ("BELO HORIZONTE", "Belo Horizonte", "MG"),
    ("CONTAGEM", "Contagem", "MG"),
    ("CURITIBA", "Curitiba", "PR"),
    ("JOINVILLE", "Joinville", "SC"),
    ("PORTO ALEGRE", "Porto Alegre", "RS"),
    ("GOIANIA", "Goiânia", "GO"),
    ("RECIFE", "Recife", "PE"),
    ("SALVADOR", "Salvador", "BA"),
];

/// Diretório de filiais.
#[derive(Debug, Clone)]
pub struct BranchDirectory {
    entries: HashMap<String, Place>,
    default_origin: Place,
}

impl BranchDirectory {
    /// Monta o diretório com as filiais conhecidas mais as configuradas.
    ///
    /// Entradas configuradas substituem as conhecidas com o mesmo nome.
    pub fn from_config(config: &OriginConfig) -> Self {
        let mut entries: HashMap<String, Place> = KNOWN_BRANCHES
            .iter()
            .map(|&(name, city, state)| (normalize_text(name), Place::new(city, state)))
            .collect();

        for (name, target) in &config.branches {
            let place = Place::parse(target);
            if place.state.is_empty() {
                tracing::warn!(branch = %name, target = %target, "branch mapping without UF");
            }
            entries.insert(branch_key(name), place);
        }

        Self {
            entries,
            default_origin: Place::new(config.default_city.clone(), config.default_state.clone()),
        }
    }

    pub fn default_origin(&self) -> &Place {
        &self.default_origin
    }

    /// Origem mapeada para a filial, se houver.
    pub fn lookup(&self, branch: &str) -> Option<&Place> {
        let key = branch_key(branch);
        if key.is_empty() {
            return None;
        }
        self.entries.get(&key)
    }

    /// Origem da filial, ou a origem padrão.
    pub fn origin_for(&self, branch: Option<&str>) -> &Place {
        branch
            .and_then(|b| self.lookup(b))
            .unwrap_or(&self.default_origin)
    }
}

/// Nome normalizado, sem o prefixo "FILIAL".
fn branch_key(name: &str) -> String {
    let norm = normalize_text(name);
    norm.strip_prefix("FILIAL ")
        .map(str::to_string)
        .unwrap_or(norm)
}
