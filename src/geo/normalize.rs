//! Normalização de textos e chaves de cache.

use crate::types::shipment::{GeoPoint, Place};

/// Remove acentos de um caractere latino.
fn strip_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' | 'Ç' => 'C',
        'ñ' | 'Ñ' => 'N',
        other => other,
    }
}

/// Caixa alta, sem acentos, espaços colapsados.
///
/// `"  São   Paulo "` → `"SAO PAULO"`.
pub fn normalize_text(text: &str) -> String {
    let upper: String = text
        .chars()
        .map(strip_diacritic)
        .flat_map(char::to_uppercase)
        .collect();
    upper.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Chave de geocodificação: `CIDADE-UF`.
pub fn geocode_key(place: &Place) -> String {
    format!("{}-{}", normalize_text(&place.city), normalize_text(&place.state))
}

/// Chave de rota: `lat1,lon1-lat2,lon2` com 4 casas decimais.
pub fn route_key(from: GeoPoint, to: GeoPoint) -> String {
    format!(
        "{:.4},{:.4}-{:.4},{:.4}",
        from.lat, from.lon, to.lat, to.lon
    )
}

/// Verifica se dois locais são a mesma cidade.
pub fn same_place(a: &Place, b: &Place) -> bool {
    geocode_key(a) == geocode_key(b)
}
