//! Construction des documents SOAP sortants (réponses et requêtes).

use xmltree::{Element, EmitterConfig, XMLNode};

use super::SoapError;

/// Données sortantes d'une action : réponse d'action ou payload de
/// notification en cours de construction.
///
/// Les paires (nom, valeur) sont émises dans l'ordre d'insertion. Les
/// valeurs sont stockées telles quelles : c'est à l'appelant de
/// pré-échapper avec [`xml_quote`](super::xml_quote) ce qui doit
/// contenir des caractères significatifs XML.
#[derive(Debug, Clone, Default)]
pub struct SoapOutgoing {
    service_type: String,
    name: String,
    data: Vec<(String, String)>,
}

impl SoapOutgoing {
    /// Crée un document sortant pour une action d'un service donné.
    ///
    /// # Arguments
    ///
    /// * `service_type` - URN du service (ex:
    ///   "urn:schemas-upnp-org:service:AVTransport:1")
    /// * `name` - Nom de l'action (ex: "GetPositionInfo")
    pub fn new(service_type: &str, name: &str) -> Self {
        Self {
            service_type: service_type.to_string(),
            name: name.to_string(),
            data: Vec::new(),
        }
    }

    /// Retourne le nom de l'action.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Paires accumulées, dans l'ordre d'insertion.
    pub fn data(&self) -> &[(String, String)] {
        &self.data
    }

    /// Ajoute une paire (nom, valeur) à la réponse.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use pmodevhost::soap::SoapOutgoing;
    /// let mut out = SoapOutgoing::new("urn:x", "GetVolume");
    /// out.addarg("CurrentVolume", "42");
    /// assert_eq!(out.data().len(), 1);
    /// ```
    pub fn addarg(&mut self, name: &str, value: &str) -> &mut Self {
        self.data.push((name.to_string(), value.to_string()));
        self
    }

    /// Construit le corps SOAP : `<u:Name[Response] xmlns:u="…">` avec
    /// un élément enfant par paire, chacun portant un nœud texte
    /// littéral.
    ///
    /// # Arguments
    ///
    /// * `is_response` - Si vrai, le tag racine est suffixé `Response`
    pub fn build_soap_body(&self, is_response: bool) -> Element {
        let mut top_name = format!("u:{}", self.name);
        if is_response {
            top_name.push_str("Response");
        }

        let mut top = Element::new(&top_name);
        top.attributes
            .insert("xmlns:u".to_string(), self.service_type.clone());

        for (name, value) in &self.data {
            let mut child = Element::new(name);
            child.children.push(XMLNode::Text(value.clone()));
            top.children.push(XMLNode::Element(child));
        }

        top
    }

    /// Sérialise le corps SOAP en chaîne XML.
    ///
    /// # Errors
    ///
    /// Retourne une erreur si la sérialisation échoue.
    pub fn to_xml(&self, is_response: bool) -> Result<String, SoapError> {
        let elem = self.build_soap_body(is_response);

        let config = EmitterConfig::new()
            .write_document_declaration(false)
            .perform_indent(false);

        let mut buf = Vec::new();
        elem.write_with_config(&mut buf, config)?;

        Ok(String::from_utf8(buf).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::SoapIncoming;

    #[test]
    fn test_build_response_body() {
        let mut out = SoapOutgoing::new("urn:schemas-upnp-org:service:AVTransport:1", "Play");
        out.addarg("Track", "5").addarg("TrackDuration", "00:03:45");

        let body = out.build_soap_body(true);
        assert_eq!(body.name, "u:PlayResponse");
        assert_eq!(
            body.attributes.get("xmlns:u").map(String::as_str),
            Some("urn:schemas-upnp-org:service:AVTransport:1")
        );
        assert_eq!(body.children.len(), 2);
    }

    #[test]
    fn test_build_request_body_no_suffix() {
        let out = SoapOutgoing::new("urn:x", "Stop");
        let body = out.build_soap_body(false);
        assert_eq!(body.name, "u:Stop");
        assert!(body.children.is_empty());
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut out = SoapOutgoing::new("urn:x", "GetMediaInfo");
        out.addarg("NrTracks", "1")
            .addarg("MediaDuration", "00:04:00")
            .addarg("CurrentURI", "http://example.com/a.mp3");

        let body = out.build_soap_body(true);
        let names: Vec<&str> = body
            .children
            .iter()
            .filter_map(|n| n.as_element())
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["NrTracks", "MediaDuration", "CurrentURI"]);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let mut out = SoapOutgoing::new("urn:x", "GetPositionInfo");
        out.addarg("Track", "5")
            .addarg("RelTime", "00:01:02")
            .addarg("TrackURI", "http://example.com/t.flac");

        let xml = out.to_xml(true).unwrap();
        let incoming = SoapIncoming::decode("GetPositionInfo", &xml).unwrap();

        let pairs: Vec<(&str, &str)> = incoming.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("Track", "5"),
                ("RelTime", "00:01:02"),
                ("TrackURI", "http://example.com/t.flac"),
            ]
        );
    }
}
