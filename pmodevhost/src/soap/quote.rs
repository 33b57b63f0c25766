//! Échappement XML limité aux cinq entités prédéfinies.

/// Échappe `& < > " '` vers leurs cinq entités nommées.
///
/// Tout autre caractère est recopié tel quel. C'est l'échappement à
/// appliquer aux valeurs de variables avant de les confier au runtime
/// (notifications, acceptation d'abonnement).
///
/// # Examples
///
/// ```rust
/// use pmodevhost::soap::xml_quote;
/// assert_eq!(xml_quote("a<b&c"), "a&lt;b&amp;c");
/// ```
pub fn xml_quote(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Remplace `&quot; &amp; &lt; &gt; &apos;` par leurs caractères.
///
/// Un `&…` non terminé (pas de `;` jusqu'à la fin de la chaîne) ou une
/// entité inconnue sont recopiés tels quels : ce n'est jamais une
/// erreur.
///
/// # Examples
///
/// ```rust
/// use pmodevhost::soap::xml_unquote;
/// assert_eq!(xml_unquote("a&amp;b"), "a&b");
/// assert_eq!(xml_unquote("a&unknown;b"), "a&unknown;b");
/// ```
pub fn xml_unquote(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'&' {
            let Some(semi) = input[i..].find(';').map(|j| i + j) else {
                // Pas de ';' : le reste passe verbatim
                out.push_str(&input[i..]);
                return out;
            };
            match &input[i + 1..semi] {
                "quot" => out.push('"'),
                "amp" => out.push('&'),
                "lt" => out.push('<'),
                "gt" => out.push('>'),
                "apos" => out.push('\''),
                _ => out.push_str(&input[i..=semi]),
            }
            i = semi + 1;
        } else {
            let c = input[i..].chars().next().unwrap();
            out.push(c);
            i += c.len_utf8();
        }
    }
    out
}

/// Formate un entier en chaîne décimale.
pub fn i2s(value: i32) -> String {
    value.to_string()
}
