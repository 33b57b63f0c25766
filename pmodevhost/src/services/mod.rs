//! # Contrat de capacité des services UPnP
//!
//! Un service hébergé expose son identité (type et id) et son état
//! sous forme de listes parallèles nom/valeur, interrogées par la
//! boucle d'événements du device. L'implémentation concrète (volume,
//! transport, etc.) appartient à l'application hôte : ce module ne
//! définit que la couture.

use std::sync::Arc;

/// Capacité exposée par un service hébergé.
///
/// Les implémentations sont fournies par l'application hôte et doivent
/// survivre au device auquel elles sont attachées. Le device ne les
/// possède pas : il n'en garde que des références partagées.
///
/// # Eventing
///
/// [`event_data`](Self::event_data) est appelée sous le verrou du
/// device, à chaque tick de la boucle d'événements et lors de
/// l'acceptation d'un abonnement. L'implémentation doit être rapide et
/// ne jamais rappeler le device (risque d'interblocage).
pub trait UpnpService: Send + Sync {
    /// Type du service (ex:
    /// "urn:schemas-upnp-org:service:AVTransport:1").
    fn service_type(&self) -> &str;

    /// Identifiant du service (ex:
    /// "urn:upnp-org:serviceId:AVTransport").
    fn service_id(&self) -> &str;

    /// Rapporte l'état sous forme de listes parallèles nom/valeur.
    ///
    /// # Arguments
    ///
    /// * `all` - Si vrai, rapporter l'état complet ; sinon seulement
    ///   les variables modifiées depuis le dernier appel
    ///
    /// L'implémentation par défaut ne rapporte rien : un service sans
    /// eventing n'a rien à redéfinir.
    fn event_data(&self, all: bool) -> (Vec<String>, Vec<String>) {
        let _ = all;
        (Vec::new(), Vec::new())
    }

    /// Installe un listener typé pour les changements de variables.
    ///
    /// No-op par défaut : seuls les services qui publient des valeurs
    /// typées à une couche supérieure le redéfinissent.
    fn install_reporter(&self, reporter: Arc<dyn VarEventReporter>) {
        let _ = reporter;
    }

    /// Retourne le listener installé, s'il y en a un.
    fn reporter(&self) -> Option<Arc<dyn VarEventReporter>> {
        None
    }
}

/// Listener typé des changements de variables d'état.
///
/// À implémenter par le code client de plus haut niveau (une interface
/// graphique par exemple) pour recevoir les changements sous forme
/// typée. Les méthodes pour les métadonnées structurées et les listes
/// d'identifiants ont des implémentations no-op : tous les listeners
/// n'en ont pas besoin.
pub trait VarEventReporter: Send + Sync {
    /// Variable entière modifiée.
    fn changed_int(&self, name: &str, value: i32);

    /// Variable chaîne modifiée.
    fn changed_str(&self, name: &str, value: &str);

    /// Métadonnées structurées modifiées (sérialisées). Rarement utile.
    fn changed_meta(&self, name: &str, metadata: &str) {
        let _ = (name, metadata);
    }

    /// Liste d'identifiants entiers modifiée. Rarement utile.
    fn changed_ids(&self, name: &str, ids: &[i32]) {
        let _ = (name, ids);
    }
}
