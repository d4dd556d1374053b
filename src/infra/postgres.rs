use {
    super::store::Store,
    crate::domain::error::StoreError,
    crate::domain::grant::{AccessGrant, GrantOutcome, GrantedAccess, NewAccessGrant},
    crate::domain::id::{Email, OrderId, PaymentRef, UserId},
    crate::domain::money::Amount,
    crate::domain::payment::{NewPayment, Payment, PaymentParts, PaymentStatus},
    crate::domain::product::Product,
    async_trait::async_trait,
    chrono::{DateTime, Utc},
    sqlx::postgres::PgPoolOptions,
    sqlx::{PgPool, Row},
    std::time::Duration,
    uuid::Uuid,
};

/// The `payments` projection the domain model is rebuilt from. `amount` is
/// NUMERIC rupees in the table; the cast keeps paise conversion inside SQL
/// so no decimal type crosses the boundary.
const PAYMENT_COLS: &str = "id, email, mobile_number, \
     (amount * 100)::BIGINT AS amount_paise, \
     razorpay_order_id, razorpay_payment_id, status, verified_at, \
     google_drive_link, delivery_method, whatsapp_sent, whatsapp_url, created_at";

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    email: String,
    mobile_number: Option<String>,
    amount_paise: i64,
    razorpay_order_id: Option<String>,
    razorpay_payment_id: Option<String>,
    status: String,
    verified_at: Option<DateTime<Utc>>,
    google_drive_link: Option<String>,
    delivery_method: Option<String>,
    whatsapp_sent: bool,
    whatsapp_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, err: &dyn std::fmt::Display| {
            StoreError::Corrupt(format!("payment {}: {what}: {err}", row.id))
        };
        Ok(Payment::from_parts(PaymentParts {
            id: row.id,
            email: Email::new(&row.email).map_err(|e| corrupt("email", &e))?,
            mobile_number: row.mobile_number.clone(),
            amount: Amount::from_paise(row.amount_paise).map_err(|e| corrupt("amount", &e))?,
            order_id: row
                .razorpay_order_id
                .as_deref()
                .map(OrderId::new)
                .transpose()
                .map_err(|e| corrupt("razorpay_order_id", &e))?,
            payment_ref: row
                .razorpay_payment_id
                .as_deref()
                .map(PaymentRef::new)
                .transpose()
                .map_err(|e| corrupt("razorpay_payment_id", &e))?,
            status: PaymentStatus::try_from(row.status.as_str())
                .map_err(|e| corrupt("status", &e))?,
            verified_at: row.verified_at,
            drive_link: row.google_drive_link,
            delivery_method: row.delivery_method,
            whatsapp_sent: row.whatsapp_sent,
            whatsapp_url: row.whatsapp_url,
            created_at: row.created_at,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    price_paise: i64,
    access_link: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Product {
            id: row.id,
            name: row.name,
            price: Amount::from_paise(row.price_paise)
                .map_err(|e| StoreError::Corrupt(format!("product {}: price: {e}", row.id)))?,
            access_link: row.access_link,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and bring the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migrations failed: {e}")))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_payment_where(
        &self,
        clause: &str,
        bind: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let sql = format!("SELECT {PAYMENT_COLS} FROM payments WHERE {clause}");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Payment::try_from).transpose()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, StoreError> {
        let created_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO payments \
                (id, email, mobile_number, amount, razorpay_order_id, \
                 razorpay_payment_id, status, verified_at, google_drive_link) \
             VALUES ($1, $2, $3, $4::NUMERIC / 100, $5, $6, $7, $8, $9) \
             RETURNING created_at",
        )
        .bind(payment.id())
        .bind(payment.email().as_str())
        .bind(payment.mobile_number())
        .bind(payment.amount().paise())
        .bind(payment.order_id().map(OrderId::as_str))
        .bind(payment.payment_ref().map(PaymentRef::as_str))
        .bind(payment.status().as_str())
        .bind(payment.verified_at())
        .bind(payment.drive_link())
        .fetch_one(&self.pool)
        .await?;

        Ok(payment.into_payment(created_at))
    }

    async fn payment(&self, id: Uuid) -> Result<Option<Payment>, StoreError> {
        let sql = format!("SELECT {PAYMENT_COLS} FROM payments WHERE id = $1");
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Payment::try_from).transpose()
    }

    async fn payments_for_email(&self, email: &Email) -> Result<Vec<Payment>, StoreError> {
        let sql = format!(
            "SELECT {PAYMENT_COLS} FROM payments \
             WHERE LOWER(email) = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(email.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn payment_by_order_id(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<Payment>, StoreError> {
        self.fetch_payment_where("razorpay_order_id = $1", order_id.as_str())
            .await
    }

    async fn payment_by_ref(
        &self,
        payment_ref: &PaymentRef,
    ) -> Result<Option<Payment>, StoreError> {
        self.fetch_payment_where("razorpay_payment_id = $1", payment_ref.as_str())
            .await
    }

    async fn latest_pending_for_email(
        &self,
        email: &Email,
    ) -> Result<Option<Payment>, StoreError> {
        self.fetch_payment_where(
            "LOWER(email) = $1 AND status = 'pending' ORDER BY created_at DESC LIMIT 1",
            email.as_str(),
        )
        .await
    }

    async fn complete_payment(
        &self,
        id: Uuid,
        payment_ref: Option<&PaymentRef>,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        // Conditional on still-open status: settled rows are never touched,
        // so replays and recovery re-runs fall through to rows_affected = 0.
        let result = sqlx::query(
            "UPDATE payments \
             SET status = 'completed', \
                 verified_at = COALESCE(verified_at, $2), \
                 razorpay_payment_id = COALESCE(razorpay_payment_id, $3) \
             WHERE id = $1 AND status IN ('pending', 'pending_verification')",
        )
        .bind(id)
        .bind(at)
        .bind(payment_ref.map(PaymentRef::as_str))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn settle_payment(&self, id: Uuid, status: PaymentStatus) -> Result<bool, StoreError> {
        if !status.is_failure() {
            return Ok(false);
        }
        let result = sqlx::query(
            "UPDATE payments SET status = $2 \
             WHERE id = $1 AND status IN ('pending', 'pending_verification')",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn promote_stuck_for_email(
        &self,
        email: &Email,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE payments \
             SET status = 'completed', verified_at = COALESCE(verified_at, $2) \
             WHERE LOWER(email) = $1 AND status = 'pending' \
               AND razorpay_payment_id IS NOT NULL",
        )
        .bind(email.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn record_delivery(
        &self,
        id: Uuid,
        method: &str,
        url: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE payments \
             SET delivery_method = $2, whatsapp_url = $3, whatsapp_sent = TRUE \
             WHERE id = $1",
        )
        .bind(id)
        .bind(method)
        .bind(url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, (price * 100)::BIGINT AS price_paise, \
                    access_link, is_active, created_at \
             FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Product::try_from).transpose()
    }

    async fn active_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, (price * 100)::BIGINT AS price_paise, \
                    access_link, is_active, created_at \
             FROM products WHERE is_active = TRUE ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn grant_exists(
        &self,
        user_id: &UserId,
        product_id: Uuid,
    ) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(\
                SELECT 1 FROM user_product_access \
                WHERE user_id = $1 AND product_id = $2)",
        )
        .bind(user_id.as_str())
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert_grant(&self, grant: NewAccessGrant) -> Result<GrantOutcome, StoreError> {
        // UNIQUE(user_id, product_id) decides the race; the loser's insert
        // is ignored rather than errored.
        let result = sqlx::query(
            "INSERT INTO user_product_access (id, user_id, product_id, payment_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id, product_id) DO NOTHING",
        )
        .bind(grant.id())
        .bind(grant.user_id().as_str())
        .bind(grant.product_id())
        .bind(grant.payment_id())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            Ok(GrantOutcome::Inserted)
        } else {
            Ok(GrantOutcome::AlreadyGranted)
        }
    }

    async fn grants_for_user(&self, user_id: &UserId) -> Result<Vec<GrantedAccess>, StoreError> {
        let rows = sqlx::query(
            "SELECT g.id, g.user_id, g.product_id, g.payment_id, g.granted_at, \
                    p.email AS p_email, p.mobile_number AS p_mobile_number, \
                    (p.amount * 100)::BIGINT AS p_amount_paise, \
                    p.razorpay_order_id AS p_order_id, \
                    p.razorpay_payment_id AS p_payment_ref, \
                    p.status AS p_status, p.verified_at AS p_verified_at, \
                    p.google_drive_link AS p_drive_link, \
                    p.delivery_method AS p_delivery_method, \
                    p.whatsapp_sent AS p_whatsapp_sent, \
                    p.whatsapp_url AS p_whatsapp_url, \
                    p.created_at AS p_created_at \
             FROM user_product_access g \
             LEFT JOIN payments p ON p.id = g.payment_id \
             WHERE g.user_id = $1 \
             ORDER BY g.granted_at",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let grant_id: Uuid = row.try_get("id")?;
            let user: String = row.try_get("user_id")?;
            let payment_id: Option<Uuid> = row.try_get("payment_id")?;

            let payment = match payment_id {
                None => None,
                Some(pid) => {
                    let email: Option<String> = row.try_get("p_email")?;
                    match email {
                        // Dangling payment_id (row deleted out-of-band):
                        // treat as no backing payment, which fails closed.
                        None => None,
                        Some(email) => Some(Payment::try_from(PaymentRow {
                            id: pid,
                            email,
                            mobile_number: row.try_get("p_mobile_number")?,
                            amount_paise: row.try_get("p_amount_paise")?,
                            razorpay_order_id: row.try_get("p_order_id")?,
                            razorpay_payment_id: row.try_get("p_payment_ref")?,
                            status: row.try_get("p_status")?,
                            verified_at: row.try_get("p_verified_at")?,
                            google_drive_link: row.try_get("p_drive_link")?,
                            delivery_method: row.try_get("p_delivery_method")?,
                            whatsapp_sent: row.try_get("p_whatsapp_sent")?,
                            whatsapp_url: row.try_get("p_whatsapp_url")?,
                            created_at: row.try_get("p_created_at")?,
                        })?),
                    }
                }
            };

            out.push(GrantedAccess {
                grant: AccessGrant {
                    id: grant_id,
                    user_id: UserId::new(user)
                        .map_err(|e| StoreError::Corrupt(format!("grant {grant_id}: {e}")))?,
                    product_id: row.try_get("product_id")?,
                    payment_id,
                    granted_at: row.try_get("granted_at")?,
                },
                payment,
            });
        }
        Ok(out)
    }
}
