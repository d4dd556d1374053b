use {
    crate::domain::payment::Payment, crate::infra::store::Store, reqwest::Url, serde_json::json,
};

/// How a completed payment was (or could not be) announced to the buyer.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub method: &'static str,
    pub whatsapp_url: Option<String>,
}

/// Best-effort downstream notification. Strictly a side effect of payment
/// completion: nothing here may fail the payment, so every error path is a
/// `tracing::warn!` and a shrug.
pub struct Notifier {
    http: reqwest::Client,
    automation_url: Option<String>,
    community_url: String,
}

impl Notifier {
    pub fn new(automation_url: Option<String>, community_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            automation_url,
            community_url,
        }
    }

    pub fn community_url(&self) -> &str {
        &self.community_url
    }

    /// Announce a completed payment: build a click-to-chat link when a
    /// contact number is known, hand the whole bundle to the automation
    /// workflow when one is configured, and persist what was decided.
    /// Returns `None` when there was nothing to deliver with.
    pub async fn notify_completed(&self, store: &dyn Store, payment: &Payment) -> Option<Delivery> {
        let whatsapp_url = payment
            .mobile_number()
            .and_then(|m| self.whatsapp_link(m, payment.drive_link()));

        let delivery = if whatsapp_url.is_some() {
            Some(Delivery {
                method: "whatsapp",
                whatsapp_url: whatsapp_url.clone(),
            })
        } else if self.automation_url.is_some() {
            Some(Delivery {
                method: "automation",
                whatsapp_url: None,
            })
        } else {
            None
        };

        if let Some(url) = self.automation_url.clone() {
            self.dispatch_automation(url, payment, whatsapp_url.as_deref());
        }

        if let Some(delivery) = &delivery {
            if let Err(err) = store
                .record_delivery(payment.id(), delivery.method, delivery.whatsapp_url.as_deref())
                .await
            {
                tracing::warn!(
                    payment_id = %payment.id(),
                    error = %err,
                    "failed to persist delivery metadata"
                );
            }
        } else {
            tracing::debug!(
                payment_id = %payment.id(),
                "no contact number and no automation webhook, nothing to deliver"
            );
        }

        delivery
    }

    /// `https://wa.me/<digits>?text=…` click-to-chat link carrying the
    /// content link and the community invite.
    fn whatsapp_link(&self, mobile: &str, drive_link: Option<&str>) -> Option<String> {
        let digits: String = mobile.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 10 {
            return None;
        }

        let mut text = String::from("Thanks for your purchase!");
        if let Some(link) = drive_link {
            text.push_str(" Your content: ");
            text.push_str(link);
        }
        text.push_str(" Join the community: ");
        text.push_str(&self.community_url);

        match Url::parse_with_params(&format!("https://wa.me/{digits}"), &[("text", text)]) {
            Ok(url) => Some(url.into()),
            Err(err) => {
                tracing::warn!(error = %err, "could not build wa.me link");
                None
            }
        }
    }

    /// Fire-and-forget POST to the workflow-automation webhook. Runs on a
    /// spawned task so the caller never waits on the downstream target.
    fn dispatch_automation(&self, url: String, payment: &Payment, whatsapp_url: Option<&str>) {
        let body = json!({
            "payment_id": payment.id(),
            "email": payment.email().as_str(),
            "contact": payment.mobile_number(),
            "amount_paise": payment.amount().paise(),
            "drive_link": payment.drive_link(),
            "whatsapp_url": whatsapp_url,
            "community_url": self.community_url,
        });
        let client = self.http.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&body).send().await {
                Ok(resp) if !resp.status().is_success() => tracing::warn!(
                    status = %resp.status(),
                    "automation webhook rejected the notification"
                ),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "automation webhook unreachable");
                }
            }
        });
    }
}
