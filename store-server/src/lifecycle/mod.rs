//! Order/refund lifecycle engine
//!
//! All state changes go through this module. Each operation re-reads the
//! aggregate immediately before validating and writing, so concurrent
//! conflicting transitions surface as validation failures against fresh
//! state rather than corrupting it. There is no multi-aggregate
//! transaction; the cancel-creates-refund pair is ordered as a saga with
//! idempotent retry plus a reconciliation sweep.

mod effects;
mod error;


pub use effects::SideEffect;
pub use error::{LifecycleError, LifecycleResult};

use crate::collaborators::{Catalog, MaintenanceGate, Notification, NotificationKind};
use crate::storage::KvStore;
use crate::stores::{OrderStore, RefundStore};
use crate::vouchers::VoucherService;
use shared::models::{
    Identity, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Refund, RefundStatus,
    RefundType, ReturnShipping, ReturnShippingStatus, Role,
};
use shared::util::{now_millis, prefixed_id, snowflake_id};
use std::sync::Arc;
use validator::Validate;

/// Whether cancelling an order rolls back its voucher redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoucherRevertPolicy {
    #[default]
    Always,
    Never,
}

impl std::str::FromStr for VoucherRevertPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ALWAYS" => Ok(VoucherRevertPolicy::Always),
            "NEVER" => Ok(VoucherRevertPolicy::Never),
            other => Err(format!("Unknown voucher revert policy: {other}")),
        }
    }
}

/// One line of a checkout request; prices come from the catalog, never
/// from the client
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CheckoutItem {
    pub product_id: String,
    pub quantity: i64,
}

/// Checkout input
#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, message = "Shipping method is required"))]
    pub shipping_method: String,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub voucher_code: Option<String>,
}

/// Refund creation input
#[derive(Debug, Clone, serde::Deserialize, Validate)]
pub struct RefundRequest {
    pub order_id: String,
    #[validate(length(min = 1, message = "Reason is required"))]
    pub reason: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// Optional fields that accompany specific refund transitions
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RefundTransitionExtras {
    #[serde(default)]
    pub courier: Option<String>,
    #[serde(default)]
    pub admin_note: Option<String>,
    #[serde(default)]
    pub refund_method: Option<String>,
}

/// Flat shipping rates per method, minor currency units
fn shipping_cost_for(method: &str) -> LifecycleResult<i64> {
    match method.to_uppercase().as_str() {
        "PICKUP" => Ok(0),
        "ECONOMY" => Ok(10_000),
        "REGULAR" => Ok(15_000),
        "EXPRESS" => Ok(30_000),
        other => Err(LifecycleError::Validation(format!(
            "Unknown shipping method: {other}"
        ))),
    }
}

/// The lifecycle engine
///
/// Holds the aggregate stores plus the collaborator seams checkout needs.
/// Cheap to clone; all fields are shared handles.
#[derive(Clone)]
pub struct LifecycleEngine {
    orders: OrderStore,
    refunds: RefundStore,
    vouchers: VoucherService,
    catalog: Arc<dyn Catalog>,
    maintenance: Arc<dyn MaintenanceGate>,
    revert_policy: VoucherRevertPolicy,
}

impl LifecycleEngine {
    pub fn new(
        kv: Arc<dyn KvStore>,
        catalog: Arc<dyn Catalog>,
        maintenance: Arc<dyn MaintenanceGate>,
        revert_policy: VoucherRevertPolicy,
    ) -> Self {
        Self {
            orders: OrderStore::new(kv.clone()),
            refunds: RefundStore::new(kv.clone()),
            vouchers: VoucherService::new(kv),
            catalog,
            maintenance,
            revert_policy,
        }
    }

    pub fn orders(&self) -> &OrderStore {
        &self.orders
    }

    pub fn refunds(&self) -> &RefundStore {
        &self.refunds
    }

    pub fn vouchers(&self) -> &VoucherService {
        &self.vouchers
    }

    // ========================================================================
    // Checkout
    // ========================================================================

    /// Create an order from a checkout request.
    ///
    /// Validates everything before the first write: a voucher or stock
    /// failure aborts with no partial state. Prices are snapshotted from
    /// the catalog at this moment and never recomputed afterwards.
    pub async fn create_order(
        &self,
        actor: &Identity,
        req: CheckoutRequest,
    ) -> LifecycleResult<(Order, Vec<SideEffect>)> {
        if self.maintenance.is_under_maintenance().await {
            return Err(LifecycleError::UnderMaintenance);
        }
        req.validate()
            .map_err(|e| LifecycleError::Validation(e.to_string()))?;
        if req.items.is_empty() {
            return Err(LifecycleError::OrderEmpty);
        }

        let mut items = Vec::with_capacity(req.items.len());
        for line in &req.items {
            if line.quantity <= 0 {
                return Err(LifecycleError::Validation(format!(
                    "Quantity must be positive for product {}",
                    line.product_id
                )));
            }
            let product = self
                .catalog
                .product(&line.product_id)
                .await
                .map_err(|e| LifecycleError::Internal(e.to_string()))?
                .ok_or_else(|| LifecycleError::ProductNotFound(line.product_id.clone()))?;
            if (product.stock as i64) < line.quantity {
                return Err(LifecycleError::ProductOutOfStock(line.product_id.clone()));
            }
            items.push(OrderItem {
                product_id: product.id,
                name: product.name,
                quantity: line.quantity,
                unit_price: product.price,
            });
        }

        let subtotal: i64 = items.iter().map(|i| i.line_total()).sum();
        let shipping_cost = shipping_cost_for(&req.shipping_method)?;

        let (voucher_code, discount) = match &req.voucher_code {
            Some(code) => {
                let voucher = self.vouchers.validate(code, &actor.id, subtotal)?;
                (Some(voucher.code.clone()), voucher.discount_for(subtotal))
            }
            None => (None, 0),
        };

        let now = now_millis();
        let mut order = Order {
            id: prefixed_id("ord"),
            user_id: actor.id.clone(),
            items,
            subtotal,
            shipping_cost,
            voucher_code: voucher_code.clone(),
            discount,
            total_amount: subtotal + shipping_cost - discount,
            shipping_address: req.shipping_address,
            shipping_method: req.shipping_method.to_uppercase(),
            payment_method: req.payment_method,
            payment_status: PaymentStatus::WaitingPayment,
            paid_at: None,
            status: OrderStatus::WaitingPayment,
            status_history: vec![],
            has_refund: false,
            refund_id: None,
            created_at: now,
            updated_at: now,
        };
        order.push_history("Order placed", Some(&actor.id));
        self.orders.create(&order)?;

        // Redemption happens after the order exists; the per-order marker
        // makes a crashed-and-retried checkout safe.
        if let Some(code) = &voucher_code {
            self.vouchers.redeem(code, &actor.id, &order.id)?;
        }

        tracing::info!(
            order_id = %order.id,
            user_id = %actor.id,
            total = order.total_amount,
            "Order created"
        );

        let effects = vec![
            SideEffect::ClearCart {
                user_id: actor.id.clone(),
            },
            SideEffect::Notify(Notification {
                user_id: actor.id.clone(),
                title: "Order placed".into(),
                message: format!("Order {} is awaiting payment", order.id),
                kind: NotificationKind::OrderCreated,
                order_id: Some(order.id.clone()),
            }),
        ];
        Ok((order, effects))
    }

    // ========================================================================
    // Order transitions
    // ========================================================================

    /// Update the payment status, independently of fulfillment status.
    ///
    /// Fails on cancelled orders. Moving to `Paid` records `paid_at`.
    pub fn set_payment_status(
        &self,
        actor: &Identity,
        order_id: &str,
        new_status: PaymentStatus,
    ) -> LifecycleResult<(Order, Vec<SideEffect>)> {
        if !actor.is_admin() {
            return Err(LifecycleError::Forbidden(
                "Only admins may update payment status".into(),
            ));
        }

        let mut order = self.orders.require(order_id)?;
        if order.status == OrderStatus::Cancelled {
            return Err(LifecycleError::AlreadyCancelled(order_id.to_string()));
        }

        order.payment_status = new_status;
        if new_status == PaymentStatus::Paid {
            order.paid_at = Some(now_millis());
        }
        order.push_history(
            format!("Payment status updated: {}", new_status.as_str()),
            Some(&actor.id),
        );
        self.orders.save(&order)?;

        let effects = vec![SideEffect::Notify(Notification {
            user_id: order.user_id.clone(),
            title: "Payment update".into(),
            message: format!(
                "Payment for order {} is now {}",
                order.id,
                new_status.as_str()
            ),
            kind: NotificationKind::OrderStatusChanged,
            order_id: Some(order.id.clone()),
        })];
        Ok((order, effects))
    }

    /// Advance fulfillment status by exactly one step.
    ///
    /// The requested status must be the current status's single legal
    /// successor; `WaitingPayment -> Processing` additionally requires a
    /// captured payment.
    pub fn advance_status(
        &self,
        actor: &Identity,
        order_id: &str,
        requested: OrderStatus,
    ) -> LifecycleResult<(Order, Vec<SideEffect>)> {
        if !actor.is_admin() {
            return Err(LifecycleError::Forbidden(
                "Only admins may advance order status".into(),
            ));
        }

        let mut order = self.orders.require(order_id)?;
        let current = order.status;

        if current.successor() != Some(requested) {
            return Err(LifecycleError::InvalidOrderTransition {
                from: current,
                to: requested,
            });
        }
        if current == OrderStatus::WaitingPayment
            && requested == OrderStatus::Processing
            && order.payment_status != PaymentStatus::Paid
        {
            return Err(LifecycleError::OrderNotPaid(order_id.to_string()));
        }

        order.status = requested;
        order.push_history(
            format!("Status {} -> {}", current.as_str(), requested.as_str()),
            Some(&actor.id),
        );
        self.orders.save(&order)?;

        tracing::info!(
            %order_id,
            from = current.as_str(),
            to = requested.as_str(),
            "Order status advanced"
        );

        let effects = vec![SideEffect::Notify(Notification {
            user_id: order.user_id.clone(),
            title: "Order update".into(),
            message: format!("Order {} is now {}", order.id, requested.as_str()),
            kind: NotificationKind::OrderStatusChanged,
            order_id: Some(order.id.clone()),
        })];
        Ok((order, effects))
    }

    /// Cancel an order, creating a compensating refund first when a payment
    /// was captured.
    ///
    /// Idempotent: retrying after a partial failure either finds the order
    /// already cancelled with its refund in place (error), or repairs the
    /// missing half of the saga and succeeds.
    pub fn cancel_order(
        &self,
        actor: &Identity,
        order_id: &str,
        reason: &str,
    ) -> LifecycleResult<(Order, Option<Refund>, Vec<SideEffect>)> {
        let mut order = self.orders.require(order_id)?;
        if actor.role == Role::Customer && order.user_id != actor.id {
            return Err(LifecycleError::Forbidden("Not your order".into()));
        }

        if order.status == OrderStatus::Cancelled {
            // Retry path: the cancel committed earlier but the refund may
            // not have. Repair it; otherwise report the duplicate cancel.
            if order.needs_refund_on_cancel() && self.refunds.find_by_order(order_id)?.is_none() {
                let refund = self.create_compensating_refund(&order, reason, actor)?;
                order.has_refund = true;
                order.refund_id = Some(refund.id.clone());
                order.updated_at = now_millis();
                self.orders.save(&order)?;
                tracing::warn!(%order_id, refund_id = %refund.id, "Repaired missing refund for cancelled order");
                return Ok((order, Some(refund), vec![]));
            }
            return Err(LifecycleError::AlreadyCancelled(order_id.to_string()));
        }

        if !order.status.can_cancel(actor.role) {
            return Err(LifecycleError::NotCancellable {
                order_id: order_id.to_string(),
                status: order.status,
            });
        }

        // Refund first: it is the less reversible write. A crash between
        // the two leaves a refund without a cancelled order, which the
        // duplicate-refund index turns into a no-op on retry.
        let refund = if order.needs_refund_on_cancel() {
            Some(self.create_compensating_refund(&order, reason, actor)?)
        } else {
            None
        };

        order.status = OrderStatus::Cancelled;
        if let Some(r) = &refund {
            order.has_refund = true;
            order.refund_id = Some(r.id.clone());
        }
        order.push_history(format!("Order cancelled: {reason}"), Some(&actor.id));
        self.orders.save(&order)?;

        let mut effects = vec![SideEffect::Notify(Notification {
            user_id: order.user_id.clone(),
            title: "Order cancelled".into(),
            message: format!("Order {} has been cancelled", order.id),
            kind: NotificationKind::OrderCancelled,
            order_id: Some(order.id.clone()),
        })];

        if let Some(code) = &order.voucher_code
            && self.revert_policy == VoucherRevertPolicy::Always
            && self.vouchers.revert(code, &order.user_id, &order.id)?
        {
            effects.push(SideEffect::VoucherReverted {
                code: code.clone(),
                order_id: order.id.clone(),
            });
        }

        tracing::info!(
            %order_id,
            actor = %actor.id,
            refund_created = refund.is_some(),
            "Order cancelled"
        );
        Ok((order, refund, effects))
    }

    /// Build and persist the compensating refund for a cancelled paid order.
    ///
    /// Always `AdminCancel`: the payout is system-initiated regardless of
    /// who cancelled, and nothing physical comes back. A concurrent or
    /// earlier creation is absorbed by loading the existing refund.
    fn create_compensating_refund(
        &self,
        order: &Order,
        reason: &str,
        actor: &Identity,
    ) -> LifecycleResult<Refund> {
        let now = now_millis();
        let mut refund = Refund {
            id: prefixed_id("ref"),
            order_id: order.id.clone(),
            user_id: order.user_id.clone(),
            refund_type: RefundType::AdminCancel,
            amount: order.total_amount,
            reason: reason.to_string(),
            description: None,
            evidence: vec![],
            status: RefundStatus::Pending,
            return_shipping: None,
            status_history: vec![],
            admin_note: None,
            reviewed_by: None,
            refund_method: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };
        refund.push_history("Refund created for cancelled order", Some(&actor.id));

        match self.refunds.create(&refund) {
            Ok(()) => Ok(refund),
            Err(LifecycleError::DuplicateRefund(_)) => {
                match self.refunds.find_by_order(&order.id)? {
                    Some(existing) => Ok(existing),
                    None => Err(LifecycleError::Internal(format!(
                        "Refund index claimed but refund missing for order {}",
                        order.id
                    ))),
                }
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Refunds
    // ========================================================================

    /// Create a customer return request.
    ///
    /// The order must be delivered, evidence must be attached, and no
    /// refund may exist for the order yet. The amount is snapshotted from
    /// the order total and never changes afterwards.
    pub fn create_refund(
        &self,
        actor: &Identity,
        req: RefundRequest,
    ) -> LifecycleResult<(Refund, Vec<SideEffect>)> {
        let mut order = self.orders.require(&req.order_id)?;
        if order.user_id != actor.id {
            return Err(LifecycleError::Forbidden("Not your order".into()));
        }
        if order.status != OrderStatus::Delivered {
            return Err(LifecycleError::RefundNotEligible(format!(
                "Order {} is not delivered",
                order.id
            )));
        }
        if req.evidence.is_empty() {
            return Err(LifecycleError::EvidenceRequired);
        }
        req.validate()
            .map_err(|e| LifecycleError::Validation(e.to_string()))?;

        let now = now_millis();
        let mut refund = Refund {
            id: prefixed_id("ref"),
            order_id: order.id.clone(),
            user_id: actor.id.clone(),
            refund_type: RefundType::UserRequest,
            amount: order.total_amount,
            reason: req.reason,
            description: req.description,
            evidence: req.evidence,
            status: RefundStatus::Pending,
            return_shipping: None,
            status_history: vec![],
            admin_note: None,
            reviewed_by: None,
            refund_method: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };
        refund.push_history("Refund requested", Some(&actor.id));
        self.refunds.create(&refund)?;

        order.has_refund = true;
        order.refund_id = Some(refund.id.clone());
        order.updated_at = now_millis();
        self.orders.save(&order)?;

        tracing::info!(refund_id = %refund.id, order_id = %order.id, "Refund requested");

        let effects = vec![SideEffect::Notify(Notification {
            user_id: actor.id.clone(),
            title: "Refund requested".into(),
            message: format!("Refund request for order {} received", order.id),
            kind: NotificationKind::RefundRequested,
            order_id: Some(order.id.clone()),
        })];
        Ok((refund, effects))
    }

    /// Apply one refund transition.
    ///
    /// Re-reads the refund, checks the transition table for its type, then
    /// merges the transition's extra fields atomically with the status and
    /// history write. Exactly one history entry is appended per transition.
    pub fn update_refund_status(
        &self,
        actor: &Identity,
        refund_id: &str,
        requested: RefundStatus,
        extras: RefundTransitionExtras,
    ) -> LifecycleResult<(Refund, Vec<SideEffect>)> {
        let mut refund = self.refunds.require(refund_id)?;

        // Shipping is the customer's move; everything else is admin-only.
        if requested == RefundStatus::Shipping {
            if refund.user_id != actor.id {
                return Err(LifecycleError::Forbidden("Not your refund".into()));
            }
        } else if !actor.is_admin() {
            return Err(LifecycleError::Forbidden(
                "Only admins may review refunds".into(),
            ));
        }

        let current = refund.status;
        if !current.can_transition_to(refund.refund_type, requested) {
            return Err(LifecycleError::InvalidRefundTransition {
                from: current,
                to: requested,
            });
        }

        let now = now_millis();
        let note = match requested {
            RefundStatus::Approved => {
                let courier = extras
                    .courier
                    .as_deref()
                    .filter(|c| !c.trim().is_empty())
                    .ok_or(LifecycleError::CourierRequired)?;
                refund.return_shipping = Some(ReturnShipping {
                    courier: courier.to_string(),
                    tracking_number: format!("RT{}", snowflake_id()),
                    status: ReturnShippingStatus::AwaitingShipment,
                    shipped_at: None,
                    received_at: None,
                });
                refund.reviewed_by = Some(actor.id.clone());
                refund.admin_note = extras.admin_note.clone();
                format!("Return approved, courier {courier}")
            }
            RefundStatus::Rejected => {
                let reason = extras
                    .admin_note
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
                    .ok_or(LifecycleError::RejectReasonRequired)?;
                refund.admin_note = Some(reason.to_string());
                refund.reviewed_by = Some(actor.id.clone());
                format!("Refund rejected: {reason}")
            }
            RefundStatus::Shipping => {
                let shipping = refund.return_shipping.as_mut().ok_or_else(|| {
                    LifecycleError::Internal(format!(
                        "Approved refund {refund_id} has no return shipping record"
                    ))
                })?;
                shipping.status = ReturnShippingStatus::Shipped;
                shipping.shipped_at = Some(now);
                "Return shipment confirmed by customer".to_string()
            }
            RefundStatus::Received => {
                if let Some(shipping) = refund.return_shipping.as_mut() {
                    shipping.status = ReturnShippingStatus::Received;
                    shipping.received_at = Some(now);
                }
                "Returned item received".to_string()
            }
            RefundStatus::Refunded => {
                let method = extras
                    .refund_method
                    .as_deref()
                    .filter(|m| !m.trim().is_empty())
                    .ok_or(LifecycleError::RefundMethodRequired)?;
                refund.refund_method = Some(method.to_string());
                refund.refunded_at = Some(now);
                format!("Refund paid out via {method}")
            }
            RefundStatus::Completed => "Refund archived".to_string(),
            // Unreachable targets: the table above rejects them
            other => {
                return Err(LifecycleError::InvalidRefundTransition {
                    from: current,
                    to: other,
                });
            }
        };

        refund.status = requested;
        refund.push_history(note, Some(&actor.id));
        self.refunds.save(&refund)?;

        // Paying out also flips the order's payment status.
        if requested == RefundStatus::Refunded {
            let mut order = self.orders.require(&refund.order_id)?;
            order.payment_status = PaymentStatus::Refunded;
            order.push_history("Payment status updated: REFUNDED", Some(&actor.id));
            self.orders.save(&order)?;
        }

        tracing::info!(
            %refund_id,
            from = current.as_str(),
            to = requested.as_str(),
            "Refund status updated"
        );

        let effects = vec![SideEffect::Notify(Notification {
            user_id: refund.user_id.clone(),
            title: "Refund update".into(),
            message: format!("Refund {} is now {}", refund.id, requested.as_str()),
            kind: NotificationKind::RefundStatusChanged,
            order_id: Some(refund.order_id.clone()),
        })];
        Ok((refund, effects))
    }

    /// Customer confirmation that the return parcel was handed to the
    /// courier. `Approved -> Shipping` only.
    pub fn confirm_shipment(
        &self,
        actor: &Identity,
        refund_id: &str,
    ) -> LifecycleResult<(Refund, Vec<SideEffect>)> {
        self.update_refund_status(
            actor,
            refund_id,
            RefundStatus::Shipping,
            RefundTransitionExtras::default(),
        )
    }

    /// Reconciliation sweep: create the missing compensating refund for any
    /// cancelled paid order that lost the second half of its saga.
    pub fn reconcile_missing_refunds(&self, actor: &Identity) -> LifecycleResult<Vec<Refund>> {
        if !actor.is_admin() {
            return Err(LifecycleError::Forbidden(
                "Only admins may run reconciliation".into(),
            ));
        }

        let mut created = Vec::new();
        for mut order in self.orders.list_all()? {
            if order.status != OrderStatus::Cancelled || !order.needs_refund_on_cancel() {
                continue;
            }
            if self.refunds.find_by_order(&order.id)?.is_some() {
                continue;
            }
            let refund = self.create_compensating_refund(&order, "RECONCILIATION", actor)?;
            order.has_refund = true;
            order.refund_id = Some(refund.id.clone());
            order.updated_at = now_millis();
            self.orders.save(&order)?;
            tracing::warn!(order_id = %order.id, refund_id = %refund.id, "Reconciliation created missing refund");
            created.push(refund);
        }
        Ok(created)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_order(&self, actor: &Identity, order_id: &str) -> LifecycleResult<Order> {
        let order = self.orders.require(order_id)?;
        if !actor.is_admin() && order.user_id != actor.id {
            return Err(LifecycleError::Forbidden("Not your order".into()));
        }
        Ok(order)
    }

    pub fn list_orders(&self, actor: &Identity) -> LifecycleResult<Vec<Order>> {
        if actor.is_admin() {
            self.orders.list_all()
        } else {
            self.orders.list_for_user(&actor.id)
        }
    }

    pub fn get_refund(&self, actor: &Identity, refund_id: &str) -> LifecycleResult<Refund> {
        let refund = self.refunds.require(refund_id)?;
        if !actor.is_admin() && refund.user_id != actor.id {
            return Err(LifecycleError::Forbidden("Not your refund".into()));
        }
        Ok(refund)
    }

    pub fn list_refunds(&self, actor: &Identity) -> LifecycleResult<Vec<Refund>> {
        if actor.is_admin() {
            self.refunds.list_all()
        } else {
            self.refunds.list_for_user(&actor.id)
        }
    }
}
