//! Décodage des documents d'arguments SOAP entrants.

use std::io::BufReader;
use xmltree::{Element, XMLNode};

use super::SoapError;

/// Arguments décodés d'un appel d'action entrant.
///
/// Le document reçu du runtime ressemble à :
///
/// ```text
/// <ns0:SetMute>
///   <InstanceID>0</InstanceID>
///   <Channel>Master</Channel>
///   <DesiredMute>False</DesiredMute>
/// </ns0:SetMute>
/// ```
///
/// Le tag racine est le nom (qualifié) de l'action elle-même : il est
/// ignoré au profit du nom passé par le callback du runtime. Chaque
/// élément enfant fournit un argument ; sa valeur est le contenu de son
/// premier nœud texte, ou la chaîne vide s'il n'en a pas.
///
/// Les arguments sont conservés dans l'ordre du document ; en cas de
/// doublon la dernière occurrence gagne.
#[derive(Debug, Clone)]
pub struct SoapIncoming {
    name: String,
    args: Vec<(String, String)>,
}

impl SoapIncoming {
    /// Décode le document d'arguments d'un appel d'action.
    ///
    /// # Arguments
    ///
    /// * `call_name` - Nom de l'action, tel que fourni par le callback
    /// * `xml` - Document d'arguments sérialisé
    ///
    /// # Errors
    ///
    /// Échoue si le document n'a pas de nœud racine exploitable. Un
    /// document dont la racine n'a aucun enfant est valide ("pas
    /// d'arguments").
    pub fn decode(call_name: &str, xml: &str) -> Result<Self, SoapError> {
        let top = Element::parse(BufReader::new(xml.as_bytes()))?;

        let mut args = Vec::new();
        for child in &top.children {
            if let Some(elem) = child.as_element() {
                args.push((elem.name.clone(), first_text(elem)));
            }
        }

        Ok(Self {
            name: call_name.to_string(),
            args,
        })
    }

    /// Retourne le nom de l'appel.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nombre d'arguments décodés.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Vrai si aucun argument n'a été décodé.
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Itère sur les paires (nom, valeur) dans l'ordre du document.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Valeur brute d'un argument (dernière occurrence).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Accesseur chaîne : échoue seulement si la clé est absente.
    ///
    /// Une valeur vide est valide.
    pub fn get_string(&self, name: &str) -> Result<&str, SoapError> {
        self.get(name)
            .ok_or_else(|| SoapError::MissingArgument(name.to_string()))
    }

    /// Accesseur booléen.
    ///
    /// Reconnaît `0/false/f/no/off` et `1/true/t/yes/on` (insensible à
    /// la casse). Échoue si la clé est absente, la valeur vide, ou le
    /// token non reconnu.
    pub fn get_bool(&self, name: &str) -> Result<bool, SoapError> {
        let value = self.get_non_empty(name)?;
        match value.to_ascii_lowercase().as_str() {
            "0" | "false" | "f" | "no" | "off" => Ok(false),
            "1" | "true" | "t" | "yes" | "on" => Ok(true),
            _ => Err(SoapError::BadBoolean(
                name.to_string(),
                value.to_string(),
            )),
        }
    }

    /// Accesseur entier, sémantique `atoi`.
    ///
    /// Échoue seulement si la clé est absente ou la valeur vide ; un
    /// contenu non numérique vaut 0.
    pub fn get_int(&self, name: &str) -> Result<i32, SoapError> {
        let value = self.get_non_empty(name)?;
        Ok(atoi(value))
    }

    fn get_non_empty(&self, name: &str) -> Result<&str, SoapError> {
        let value = self.get_string(name)?;
        if value.is_empty() {
            return Err(SoapError::EmptyValue(name.to_string()));
        }
        Ok(value)
    }
}

/// Contenu du premier nœud texte enfant, ou chaîne vide.
pub(super) fn first_text(elem: &Element) -> String {
    elem.children
        .iter()
        .find_map(|n| match n {
            XMLNode::Text(t) => Some(t.clone()),
            _ => None,
        })
        .unwrap_or_default()
}

/// Parse une tête décimale façon `atoi` : blancs de tête, signe
/// optionnel, suite de chiffres ; tout le reste est ignoré.
fn atoi(s: &str) -> i32 {
    let s = s.trim_start();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let mut value: i64 = 0;
    let mut seen = false;
    for c in rest.chars() {
        let Some(d) = c.to_digit(10) else { break };
        seen = true;
        value = value.saturating_mul(10).saturating_add(d as i64);
        if value > i64::from(i32::MAX) + 1 {
            value = i64::from(i32::MAX) + 1;
        }
    }
    if !seen {
        return 0;
    }
    let signed = if negative { -value } else { value };
    signed.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
