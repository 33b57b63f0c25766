//! Boucle d'événements du device : publication périodique des
//! changements d'état des services.
//!
//! La boucle interroge chaque service à intervalle fixe et pousse les
//! variables modifiées aux abonnés via le runtime. Un handler d'action
//! peut la réveiller avant l'échéance avec
//! [`UpnpDevice::loop_wakeup`] pour publier un changement sans
//! attendre le prochain tick ; les réveils rapprochés sont coalescés
//! par [`WakeupFilter`] pour qu'une rafale d'actions ne se traduise
//! pas par une rafale de NOTIFY.

use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::devices::{DeviceError, UpnpDevice};
use crate::runtime::EXPIRE_SECS;

/// Période de polling de la boucle.
pub(crate) const LOOP_WAIT: Duration = Duration::from_millis(1000);

/// Un broadcast d'état complet tous les N ticks, pour resynchroniser
/// les abonnés ayant manqué un NOTIFY.
pub(crate) const FULL_STATE_PERIOD: u64 = 10;

/// Coalescence des réveils anticipés de la boucle.
///
/// Au plus un réveil anticipé est honoré par période : un second
/// signal arrivant moins d'une période après le précédent est absorbé,
/// les changements qu'il annonce seront ramassés par le passage déjà
/// déclenché ou par le tick suivant. L'expiration normale du timer
/// réarme le filtre.
#[derive(Debug)]
pub struct WakeupFilter {
    interval: Duration,
    last_early: Option<Instant>,
}

impl WakeupFilter {
    /// Crée un filtre pour la période donnée.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_early: None,
        }
    }

    /// Le timer a expiré normalement : réarme le filtre.
    pub fn on_timeout(&mut self) {
        self.last_early = None;
    }

    /// Un signal de réveil est arrivé avant l'échéance. Retourne
    /// `true` si le réveil doit être honoré, `false` s'il est absorbé.
    pub fn on_signal(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_early {
            if now.duration_since(last) < self.interval {
                debug!("wakeup coalesced");
                return false;
            }
        }
        self.last_early = Some(now);
        true
    }
}

impl UpnpDevice {
    /// Annonce le device sur le réseau.
    ///
    /// Enregistre la description auprès du runtime puis envoie les
    /// annonces de présence.
    fn start(&self) -> Result<(), DeviceError> {
        self.runtime()
            .register_root_device(self.device_id(), self.description())?;
        self.runtime()
            .send_advertisement(self.device_id(), EXPIRE_SECS)?;
        info!("📡 UPnP device started: [{}]", self.device_id());
        Ok(())
    }

    /// Fait tourner la boucle d'événements jusqu'à
    /// [`should_exit`](Self::should_exit).
    ///
    /// Annonce d'abord le device, puis à chaque période interroge les
    /// services dans leur ordre d'enregistrement et notifie les
    /// variables modifiées. Tous les [`FULL_STATE_PERIOD`] ticks,
    /// l'état complet est rediffusé.
    ///
    /// # Errors
    ///
    /// Seule l'annonce initiale peut échouer. Les échecs de NOTIFY en
    /// régime permanent sont journalisés et absorbés.
    pub async fn event_loop(self: Arc<Self>) -> Result<(), DeviceError> {
        self.start()?;

        let mut filter = WakeupFilter::new(LOOP_WAIT);
        let mut count: u64 = 0;

        'outer: loop {
            let deadline = Instant::now() + LOOP_WAIT;
            loop {
                tokio::select! {
                    _ = self.wake_signal().notified() => {
                        if self.exit_requested() {
                            break 'outer;
                        }
                        if filter.on_signal(Instant::now()) {
                            break;
                        }
                        // Signal absorbé : on continue d'attendre la
                        // même échéance
                    }
                    _ = tokio::time::sleep_until(deadline) => {
                        filter.on_timeout();
                        break;
                    }
                }
            }
            if self.exit_requested() {
                break;
            }

            count += 1;
            let all = count % FULL_STATE_PERIOD == 0;

            for service_id in self.service_ids() {
                if let Some((names, values)) = self.service_event_data(&service_id, all) {
                    self.notify_event(&service_id, &names, &values).await;
                }
            }
        }

        info!("event loop returning: [{}]", self.device_id());
        Ok(())
    }
}
