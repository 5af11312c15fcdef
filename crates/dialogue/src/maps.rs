/// City appended to addresses that do not name it
pub const CITY: &str = "Formosa";

const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/?api=1&query=";

/// Google Maps search link for an office address
#[must_use]
pub fn map_link(address: &str) -> String {
    let address = address.trim();
    let query = if address.to_lowercase().contains(&CITY.to_lowercase()) {
        address.to_string()
    } else {
        format!("{address}, {CITY}")
    };
    format!("{MAPS_SEARCH_URL}{}", urlencoding::encode(&query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn appends_city_when_missing() {
        assert_eq!(
            map_link("Av. 25 de Mayo 123"),
            "https://www.google.com/maps/search/?api=1&query=Av.%2025%20de%20Mayo%20123%2C%20Formosa"
        );
    }

    #[test]
    fn keeps_address_that_names_the_city() {
        let link = map_link("Belgrano 456, FORMOSA capital");
        assert!(link.ends_with("query=Belgrano%20456%2C%20FORMOSA%20capital"), "{link}");
        assert_eq!(link.matches("Formosa").count(), 0);
    }
}
