//! Décodage des payloads d'événements UPnP ("propertyset").

use std::collections::HashMap;
use std::io::BufReader;
use xmltree::Element;

use super::SoapError;
use super::incoming::first_text;

/// Décode un document propertyset d'événement UPnP.
///
/// Le format attendu est :
///
/// ```text
/// <e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
///   <e:property>
///     <variableName>new value</variableName>
///   </e:property>
///   <!-- autres variables -->
/// </e:propertyset>
/// ```
///
/// Chaque enfant de la racine est un wrapper de propriété contenant
/// exactement un élément variable, dont le tag est le nom de la
/// variable et le texte sa nouvelle valeur. Une racine sans enfant est
/// un propertyset vide, pas une erreur.
///
/// # Errors
///
/// Échoue si le document n'a pas de racine, ou si un wrapper ne
/// contient pas d'élément variable.
pub fn decode_property_set(xml: &str) -> Result<HashMap<String, String>, SoapError> {
    let top = Element::parse(BufReader::new(xml.as_bytes()))?;

    let mut out = HashMap::new();
    for (i, child) in top.children.iter().enumerate() {
        let Some(wrapper) = child.as_element() else {
            continue;
        };
        let variable = wrapper
            .children
            .iter()
            .find_map(|n| n.as_element())
            .ok_or(SoapError::MalformedProperty(i))?;
        // Le runtime a déjà déséchappé les valeurs : pas de xml_unquote ici
        out.insert(variable.name.clone(), first_text(variable));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_property_set() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><TransportState>PLAYING</TransportState></e:property>
  <e:property><CurrentTrack>3</CurrentTrack></e:property>
</e:propertyset>"#;

        let props = decode_property_set(xml).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("TransportState").map(String::as_str), Some("PLAYING"));
        assert_eq!(props.get("CurrentTrack").map(String::as_str), Some("3"));
    }

    #[test]
    fn test_decode_empty_property_set() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0"/>"#;
        let props = decode_property_set(xml).unwrap();
        assert!(props.is_empty());
    }

    #[test]
    fn test_decode_empty_variable_value() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><Metadata></Metadata></e:property>
</e:propertyset>"#;
        let props = decode_property_set(xml).unwrap();
        assert_eq!(props.get("Metadata").map(String::as_str), Some(""));
    }

    #[test]
    fn test_decode_malformed_wrapper_fails() {
        let xml = r#"<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>no variable element</e:property>
</e:propertyset>"#;
        assert!(decode_property_set(xml).is_err());
    }

    #[test]
    fn test_decode_missing_top_node_fails() {
        assert!(decode_property_set("").is_err());
    }
}
