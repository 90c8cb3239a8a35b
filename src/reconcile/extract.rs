//! Extração tipada de uma linha da planilha.

use super::branches::BranchDirectory;
use super::columns::ColumnMap;
use crate::geo::normalize::normalize_text;
use crate::types::errors::{FreteError, FreteResult};
use crate::types::shipment::{CargoType, Cell, Place, Shipment};

/// Maior número de eixos aceito numa célula.
const MAX_AXLES: u8 = 12;

/// Contexto compartilhado pela extração de todas as linhas.
pub struct ExtractContext<'a> {
    pub columns: &'a ColumnMap,
    pub branches: &'a BranchDirectory,
    pub default_cargo_type: CargoType,
}

/// Extrai o embarque da linha `row_index`.
pub fn extract_shipment(
    row_index: usize,
    row: &[Cell],
    ctx: &ExtractContext<'_>,
) -> FreteResult<Shipment> {
    let cols = ctx.columns;

    let city = cols
        .text(row, Some(cols.destination_city))
        .ok_or_else(|| FreteError::row(row_index, "cidade de destino ausente"))?;
    let destination = place_from(&city, cols.text(row, cols.state));
    if destination.city.is_empty() {
        return Err(FreteError::row(row_index, "cidade de destino ausente"));
    }

    let vehicle_type = cols.text(row, cols.vehicle_type);
    let axle_count = cols
        .cell(row, Some(cols.axle_count))
        .and_then(parse_axles)
        .or_else(|| vehicle_type.as_deref().and_then(infer_axles_from_vehicle))
        .ok_or_else(|| FreteError::row(row_index, "número de eixos ausente ou inválido"))?;

    let branch = cols.text(row, cols.branch);
    let origin = match cols.text(row, cols.origin_city) {
        Some(origin_city) => place_from(&origin_city, cols.text(row, cols.origin_state)),
        None => ctx.branches.origin_for(branch.as_deref()).clone(),
    };

    let cargo_type = cols
        .text(row, cols.cargo_type)
        .and_then(|text| CargoType::parse_loose(&text))
        .unwrap_or(ctx.default_cargo_type);

    Ok(Shipment {
        origin,
        destination,
        branch,
        axle_count,
        cargo_type,
        charged_value: cols.cell(row, cols.freight_value).and_then(parse_money),
        toll: cols.cell(row, cols.toll).and_then(parse_money).unwrap_or(0.0),
        batch_id: cols.text(row, cols.batch_id),
        plate: cols.text(row, cols.plate).map(|p| p.to_uppercase()),
        carrier: cols.text(row, cols.carrier),
        issue_date: cols.text(row, cols.issue_date),
        vehicle_type,
        gross_weight: cols.cell(row, cols.gross_weight).and_then(parse_money),
    })
}

/// Monta o local a partir da cidade e da UF (coluna própria ou embutida).
fn place_from(city: &str, state: Option<String>) -> Place {
    let embedded = Place::split_embedded_state(city);
    match (state, embedded) {
        (Some(uf), Some(place)) => Place::new(place.city, uf.trim().to_uppercase()),
        (Some(uf), None) => Place::new(city.trim(), uf.trim().to_uppercase()),
        (None, Some(place)) => place,
        (None, None) => Place::new(city.trim(), ""),
    }
}

/// Valor monetário: número ou texto no formato brasileiro (`R$ 1.234,56`).
pub fn parse_money(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(text) => parse_money_text(text),
        _ => None,
    }
}

fn parse_money_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // O separador que aparece por último é o decimal
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if is_grouped(&cleaned, ',') && cleaned.matches(',').count() > 1 => {
            cleaned.replace(',', "")
        }
        (Some(_), None) => cleaned.replace(',', "."),
        (None, Some(_)) if is_grouped(&cleaned, '.') => cleaned.replace('.', ""),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `true` para agrupamentos de milhar: `2.500`, `1.234.567`.
fn is_grouped(text: &str, separator: char) -> bool {
    let digits = text.trim_start_matches('-');
    let mut groups = digits.split(separator);
    let lead = match groups.next() {
        Some(lead) => lead,
        None => return false,
    };
    let lead_ok = (1..=3).contains(&lead.len())
        && lead.chars().all(|c| c.is_ascii_digit())
        && !lead.starts_with('0');
    let rest: Vec<&str> = groups.collect();
    lead_ok
        && !rest.is_empty()
        && rest
            .iter()
            .all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

/// Número de eixos: `6`, `"6"`, `"6 eixos"`.
pub fn parse_axles(cell: &Cell) -> Option<u8> {
    let value = match cell {
        Cell::Number(n) if n.fract() == 0.0 && *n >= 1.0 => *n as u64,
        Cell::Text(text) => {
            let digits: String = text
                .trim()
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<u64>().ok()?
        }
        _ => return None,
    };
    u8::try_from(value)
        .ok()
        .filter(|&axles| (1..=MAX_AXLES).contains(&axles))
}

/// Infere eixos pelo tipo de veículo.
pub fn infer_axles_from_vehicle(vehicle: &str) -> Option<u8> {
    let norm = normalize_text(vehicle);
    if norm.contains("RODOTREM") {
        Some(9)
    } else if norm.contains("BITREM") {
        Some(7)
    } else if norm.contains("CARRETA") || norm.contains("CAVALO") || norm.contains("SEMI") {
        Some(5)
    } else if norm.contains("BITRUCK") {
        Some(4)
    } else if norm.contains("TOCO") || norm.contains("TRUCK") {
        Some(3)
    } else if norm.contains("VUC") || norm.contains("3/4") || norm.contains("TRES QUARTOS") {
        Some(2)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::OriginConfig;

    fn columns(names: &[&str]) -> ColumnMap {
        let headers: Vec<Cell> = names.iter().map(|&n| Cell::from(n)).collect();
        ColumnMap::resolve(&headers).unwrap()
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money(&Cell::from("R$ 1.234,56")), Some(1234.56));
        assert_eq!(parse_money(&Cell::from("1234,5")), Some(1234.5));
        assert_eq!(parse_money(&Cell::from("1234.50")), Some(1234.5));
        assert_eq!(parse_money(&Cell::from("1.234.567")), Some(1234567.0));
        assert_eq!(parse_money(&Cell::from("0.5")), Some(0.5));
        assert_eq!(parse_money(&Cell::from(980.0)), Some(980.0));
        assert_eq!(parse_money(&Cell::from("abc")), None);
        assert_eq!(parse_money(&Cell::Empty), None);
    }

    #[test]
    fn test_parse_money_thousands_separators() {
        assert_eq!(parse_money(&Cell::from("R$ 2.500")), Some(2500.0));
        assert_eq!(parse_money(&Cell::from("1.234")), Some(1234.0));
        assert_eq!(parse_money(&Cell::from("1.234.567")), Some(1234567.0));
        assert_eq!(parse_money(&Cell::from("1.234,56")), Some(1234.56));
        assert_eq!(parse_money(&Cell::from("1,234.56")), Some(1234.56));
        assert_eq!(parse_money(&Cell::from("1,234,567")), Some(1234567.0));
        assert_eq!(parse_money(&Cell::from("R$ 2.500,00")), Some(2500.0));
        assert_eq!(parse_money(&Cell::from("2.50")), Some(2.5));
    }

    #[test]
    fn test_parse_axles() {
        assert_eq!(parse_axles(&Cell::from(6.0)), Some(6));
        assert_eq!(parse_axles(&Cell::from("6 eixos")), Some(6));
        assert_eq!(parse_axles(&Cell::from("Eixos: 9")), Some(9));
        assert_eq!(parse_axles(&Cell::from("0")), None);
        assert_eq!(parse_axles(&Cell::from(2.5)), None);
        assert_eq!(parse_axles(&Cell::from("muitos")), None);
    }

    #[test]
    fn test_infer_axles_from_vehicle() {
        assert_eq!(infer_axles_from_vehicle("VUC"), Some(2));
        assert_eq!(infer_axles_from_vehicle("3/4"), Some(2));
        assert_eq!(infer_axles_from_vehicle("Toco"), Some(3));
        assert_eq!(infer_axles_from_vehicle("Bitruck"), Some(4));
        assert_eq!(infer_axles_from_vehicle("Carreta LS"), Some(5));
        assert_eq!(infer_axles_from_vehicle("Bitrem"), Some(7));
        assert_eq!(infer_axles_from_vehicle("Rodotrem"), Some(9));
        assert_eq!(infer_axles_from_vehicle("Van"), None);
    }

    #[test]
    fn test_extract_full_row() {
        let cols = columns(&["Filial", "Destino", "UF", "Eixos", "Valor Frete", "Pedágio", "Placa"]);
        let branches = BranchDirectory::from_config(&OriginConfig::default());
        let ctx = ExtractContext {
            columns: &cols,
            branches: &branches,
            default_cargo_type: CargoType::CargaGeral,
        };
        let row = vec![
            Cell::from("Filial Curitiba"),
            Cell::from("Joinville"),
            Cell::from("sc"),
            Cell::from("5 eixos"),
            Cell::from("R$ 2.100,00"),
            Cell::from(45.9),
            Cell::from("abc1d23"),
        ];

        let s = extract_shipment(0, &row, &ctx).unwrap();
        assert_eq!(s.origin, Place::new("Curitiba", "PR"));
        assert_eq!(s.destination, Place::new("Joinville", "SC"));
        assert_eq!(s.axle_count, 5);
        assert_eq!(s.charged_value, Some(2100.0));
        assert_eq!(s.toll, 45.9);
        assert_eq!(s.plate.as_deref(), Some("ABC1D23"));
        assert_eq!(s.cargo_type, CargoType::CargaGeral);
    }

    #[test]
    fn test_extract_embedded_state_and_inferred_axles() {
        let cols = columns(&["Cidade", "Eixos", "Tipo Veículo"]);
        let branches = BranchDirectory::from_config(&OriginConfig::default());
        let ctx = ExtractContext {
            columns: &cols,
            branches: &branches,
            default_cargo_type: CargoType::Frigorificada,
        };
        let row = vec![Cell::from("CAMPINAS/SP"), Cell::Empty, Cell::from("Truck")];

        let s = extract_shipment(3, &row, &ctx).unwrap();
        assert_eq!(s.destination, Place::new("CAMPINAS", "SP"));
        assert_eq!(s.axle_count, 3);
        assert_eq!(s.origin, Place::new("São Paulo", "SP"));
        assert_eq!(s.cargo_type, CargoType::Frigorificada);
        assert_eq!(s.charged_value, None);
    }

    #[test]
    fn test_extract_missing_destination_is_row_error() {
        let cols = columns(&["Destino", "Eixos"]);
        let branches = BranchDirectory::from_config(&OriginConfig::default());
        let ctx = ExtractContext {
            columns: &cols,
            branches: &branches,
            default_cargo_type: CargoType::CargaGeral,
        };

        let err = extract_shipment(7, &[Cell::Empty, Cell::from(5.0)], &ctx).unwrap_err();
        assert!(matches!(err, FreteError::Row { row: 7, .. }));

        let short_row = vec![Cell::from("Campinas")];
        assert!(extract_shipment(8, &short_row, &ctx).is_err());
    }
}
